use extractview::compositor::compose;
use extractview::highlights::{NormalizedHighlight, group_by_page, normalize};
use extractview::preview::{PageSize, PageViewportMetrics};
use serde_json::json;

fn ids(highlights: &[NormalizedHighlight]) -> Vec<&str> {
    highlights.iter().map(|h| h.id.as_str()).collect()
}

#[test]
fn records_without_coordinates_produce_nothing() {
    let payloads = [
        json!([{ "text": "total" }, { "page": 2 }, {}]),
        json!({ "a": { "confidence": 0.9 }, "b": { "width": 10, "height": 4 } }),
        json!([]),
        json!({}),
        json!("not a payload"),
        json!(42),
        json!(null),
    ];

    for payload in payloads {
        assert!(normalize(&payload).is_empty(), "payload {payload}");
    }
}

#[test]
fn unresolvable_coordinates_drop_only_that_box() {
    let payload = json!([{
        "page_number": 1,
        "bounding_boxes": [
            { "x": 1, "y": 2, "width": 3, "height": 4 },
            { "x": "left edge", "y": 2 },
            { "x": 5, "y": null },
            { "x": [1], "y": 2 },
            { "x": "7.5", "y": " 8 " }
        ]
    }]);

    let highlights = normalize(&payload);
    assert_eq!(ids(&highlights), vec!["0-0", "0-4"]);
    assert!(highlights.iter().all(|h| h.x.is_finite() && h.y.is_finite()));
    assert_eq!((highlights[1].x, highlights[1].y), (7.5, 8.0));
}

#[test]
fn explicit_page_and_box_list() {
    let payload = json!([{
        "page_number": 3,
        "bounding_boxes": [{ "x": 10, "y": 20, "width": 5, "height": 6 }]
    }]);

    assert_eq!(
        normalize(&payload),
        vec![NormalizedHighlight {
            id: "0-0".to_string(),
            page_number: 3,
            x: 10.0,
            y: 20.0,
            width: 5.0,
            height: 6.0,
        }]
    );
}

#[test]
fn missing_or_unusable_page_defaults_to_first_page() {
    let payload = json!({
        "1": { "base_x": 12, "base_y": 40, "width": 100, "height": 9 },
        "2": { "page": 0, "base_x": 12, "base_y": 52 },
        "3": { "page": "two", "base_x": 12, "base_y": 64 },
        "4": { "page": -3, "base_x": 12, "base_y": 76 }
    });

    let highlights = normalize(&payload);
    assert_eq!(highlights.len(), 4);
    assert!(highlights.iter().all(|h| h.page_number == 1));
    assert_eq!(ids(&highlights), vec!["1-0", "2-0", "3-0", "4-0"]);
}

#[test]
fn line_records_keyed_by_line_number() {
    // Shape of a line-level highlight mapping returned by an extraction service
    let payload = json!({
        "17": {
            "page": 2,
            "base_x": 72.0,
            "base_y": 144.5,
            "width": 310.25,
            "height": 11.0,
            "page_height": 792
        },
        "18": {
            "page": "2",
            "box": { "left": 72, "top": "158.5", "size": { "width": 120, "height": 11 } }
        }
    });

    let highlights = normalize(&payload);
    assert_eq!(ids(&highlights), vec!["17-0", "18-0"]);
    assert_eq!(highlights[1].page_number, 2);
    assert_eq!(
        (highlights[1].x, highlights[1].y, highlights[1].width, highlights[1].height),
        (72.0, 158.5, 120.0, 11.0)
    );
}

#[test]
fn grouping_keeps_input_order_per_page() {
    let payload = json!([
        { "page": 1, "x": 1, "y": 1 },
        { "page": 1, "x": 2, "y": 2 },
        { "page": 2, "x": 3, "y": 3 }
    ]);

    let index = group_by_page(&normalize(&payload));
    assert_eq!(index.pages(), vec![1, 2]);
    assert_eq!(ids(index.page(1)), vec!["0-0", "1-0"]);
    assert_eq!(ids(index.page(2)), vec!["2-0"]);
    assert!(index.page(3).is_empty());
}

#[test]
fn normalized_payload_composes_onto_a_rendered_page() {
    let payload = json!([{
        "page_number": 1,
        "bounding_boxes": [{ "x": 100, "y": 200, "width": 50, "height": 20 }]
    }]);
    let index = group_by_page(&normalize(&payload));
    let metrics = PageViewportMetrics::new(PageSize::new(600.0, 800.0), PageSize::new(300.0, 400.0));

    let boxes = compose(1, &index, Some(&metrics));
    assert_eq!(boxes.len(), 1);
    assert_eq!(
        (boxes[0].left, boxes[0].top, boxes[0].width, boxes[0].height),
        (50.0, 100.0, 25.0, 10.0)
    );
    assert!(compose(1, &index, None).is_empty());
}
