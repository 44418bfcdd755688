//! Tolerant parsing of extraction highlight payloads

use serde_json::{Map, Value};

use super::NormalizedHighlight;

/// Page number fields, in priority order
pub const PAGE_ALIASES: &[&str] = &["page_number", "page"];
/// Fields that may carry the box (or list of boxes) of an entry
pub const BOX_ALIASES: &[&str] = &["bounding_boxes", "boxes", "box"];
pub const X_ALIASES: &[&str] = &["base_x", "x", "left", "start_x", "startX"];
pub const Y_ALIASES: &[&str] = &["base_y", "y", "top", "start_y", "startY"];
pub const WIDTH_ALIASES: &[&str] = &["width", "w"];
pub const HEIGHT_ALIASES: &[&str] = &["height", "h"];

/// Nested record that may hold `width`/`height` when the flat fields are absent
const SIZE_FIELD: &str = "size";

/// Normalize an arbitrary payload into a flat list of highlights.
///
/// Arrays are keyed by index, objects by their keys. Any other value yields
/// nothing. Malformed entries and boxes are skipped, never reported.
#[must_use]
pub fn normalize(payload: &Value) -> Vec<NormalizedHighlight> {
    let mut normalized = Vec::new();

    match payload {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                normalize_entry(&index.to_string(), item, &mut normalized);
            }
        }
        Value::Object(entries) => {
            for (key, item) in entries {
                normalize_entry(key, item, &mut normalized);
            }
        }
        _ => {}
    }

    normalized
}

fn normalize_entry(key: &str, entry: &Value, out: &mut Vec<NormalizedHighlight>) {
    let Value::Object(record) = entry else {
        return;
    };

    let page_number = first_present(record, PAGE_ALIASES)
        .and_then(read_number)
        .map(page_from_number)
        .unwrap_or(1);

    let boxes: Vec<&Value> = match first_present(record, BOX_ALIASES).filter(|v| !is_falsy(v)) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
        None => vec![entry],
    };

    for (index, candidate) in boxes.into_iter().enumerate() {
        let Value::Object(bbox) = candidate else {
            continue;
        };

        let Some(x) = first_present(bbox, X_ALIASES).and_then(read_number) else {
            continue;
        };
        let Some(y) = first_present(bbox, Y_ALIASES).and_then(read_number) else {
            continue;
        };

        let width = dimension(bbox, WIDTH_ALIASES, "width");
        let height = dimension(bbox, HEIGHT_ALIASES, "height");

        out.push(NormalizedHighlight {
            id: format!("{key}-{index}"),
            page_number,
            x,
            y,
            width,
            height,
        });
    }
}

/// First alias whose value is present and not `null`.
///
/// A present but unusable value still wins over later aliases.
fn first_present<'a>(record: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .find_map(|alias| record.get(*alias).filter(|value| !value.is_null()))
}

/// `false`, `0` and `""` count as no box at all; the entry is its own box then
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

fn dimension(record: &Map<String, Value>, aliases: &[&str], size_key: &str) -> f64 {
    let candidate = first_present(record, aliases).or_else(|| match record.get(SIZE_FIELD) {
        Some(Value::Object(size)) => size.get(size_key).filter(|value| !value.is_null()),
        _ => None,
    });

    candidate.and_then(read_number).unwrap_or(0.0).max(0.0)
}

fn page_from_number(value: f64) -> u32 {
    if value >= 1.0 {
        value.trunc().min(f64::from(u32::MAX)) as u32
    } else {
        1
    }
}

/// Resolve a JSON value to a finite number.
///
/// Accepts native numbers and numeric strings (surrounding whitespace is
/// ignored). Everything else, including non-finite results, is `None`.
#[must_use]
pub fn read_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };

    number.is_finite().then_some(number)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn page_number_with_bounding_boxes() {
        let payload = json!([{
            "page_number": 3,
            "bounding_boxes": [{"x": 10, "y": 20, "width": 5, "height": 6}]
        }]);

        let highlights = normalize(&payload);
        assert_eq!(
            highlights,
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
    fn missing_page_defaults_to_first() {
        let highlights = normalize(&json!([{"x": 1, "y": 2}]));
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].page_number, 1);
    }

    #[test]
    fn unusable_page_numbers_default_to_first() {
        let payload = json!([
            {"page": "abc", "x": 1, "y": 1},
            {"page": 0, "x": 1, "y": 1},
            {"page": -4, "x": 1, "y": 1},
            {"page": true, "x": 1, "y": 1},
            {"page": "7", "x": 1, "y": 1},
            {"page": 2.9, "x": 1, "y": 1},
        ]);

        let pages: Vec<u32> = normalize(&payload).iter().map(|h| h.page_number).collect();
        assert_eq!(pages, vec![1, 1, 1, 1, 7, 2]);
    }

    #[test]
    fn page_number_takes_priority_over_page() {
        let highlights = normalize(&json!([{"page_number": 4, "page": 9, "x": 0, "y": 0}]));
        assert_eq!(highlights[0].page_number, 4);
    }

    #[test]
    fn non_container_payloads_yield_nothing() {
        for payload in [json!(null), json!(42), json!("boxes"), json!(true)] {
            assert!(normalize(&payload).is_empty(), "payload {payload}");
        }
    }

    #[test]
    fn records_without_coordinates_yield_nothing() {
        let payload = json!({
            "a": {"page": 2, "text": "hello"},
            "b": {"width": 4, "height": 4},
            "c": "not a record",
            "d": [1, 2, 3],
        });
        assert!(normalize(&payload).is_empty());
    }

    #[test]
    fn keyed_mapping_uses_entry_keys_in_document_order() {
        let payload = json!({
            "line_7": {"page": 2, "boxes": [{"x": 1, "y": 2}, {"x": 3, "y": 4}]},
            "line_2": {"page": 1, "x": 5, "y": 6},
        });

        let ids: Vec<String> = normalize(&payload).into_iter().map(|h| h.id).collect();
        assert_eq!(ids, vec!["line_7-0", "line_7-1", "line_2-0"]);
    }

    #[test]
    fn single_box_field_is_wrapped() {
        let payload = json!([{"page": 5, "box": {"left": 7, "top": 8, "w": 9, "h": 10}}]);
        let highlights = normalize(&payload);

        assert_eq!(highlights.len(), 1);
        let h = &highlights[0];
        assert_eq!((h.page_number, h.x, h.y, h.width, h.height), (5, 7.0, 8.0, 9.0, 10.0));
    }

    #[test]
    fn numeric_strings_and_size_record_are_resolved() {
        let payload = json!([{
            "base_x": " 12.5 ",
            "start_y": "40",
            "size": {"width": "30", "height": 15}
        }]);
        let h = &normalize(&payload)[0];

        assert_eq!((h.x, h.y, h.width, h.height), (12.5, 40.0, 30.0, 15.0));
    }

    #[test]
    fn camel_case_start_fields_are_accepted() {
        let h = &normalize(&json!([{"startX": 3, "startY": 4}]))[0];
        assert_eq!((h.x, h.y), (3.0, 4.0));
    }

    #[test]
    fn boxes_with_unresolvable_coordinates_are_dropped() {
        let payload = json!([{
            "page": 1,
            "bounding_boxes": [
                {"x": "left side", "y": 3},
                {"x": 1},
                {"x": "", "y": 2},
                {"x": "NaN", "y": 2},
                {"x": "inf", "y": 2},
                {"x": 4, "y": 5},
            ]
        }]);

        let highlights = normalize(&payload);
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].id, "0-5");
        assert!(highlights.iter().all(|h| h.x.is_finite() && h.y.is_finite()));
    }

    #[test]
    fn first_present_alias_wins_even_when_unusable() {
        // `base_x` is present, so `x` is never consulted
        assert!(normalize(&json!([{"base_x": "n/a", "x": 3, "y": 4}])).is_empty());
        // `null` counts as absent
        let h = &normalize(&json!([{"base_x": null, "x": 3, "y": 4}]))[0];
        assert_eq!(h.x, 3.0);
    }

    #[test]
    fn missing_or_negative_size_defaults_to_zero() {
        let payload = json!([{"x": 1, "y": 1}, {"x": 1, "y": 1, "width": -5, "height": "tall"}]);
        for h in normalize(&payload) {
            assert_eq!((h.width, h.height), (0.0, 0.0));
        }
    }

    #[test]
    fn non_object_boxes_still_consume_an_index() {
        let payload = json!([{"boxes": [3, null, {"x": 1, "y": 1}]}]);
        let highlights = normalize(&payload);

        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].id, "0-2");
    }

    #[test]
    fn read_number_rejects_non_numeric_types() {
        assert_eq!(read_number(&json!(1.5)), Some(1.5));
        assert_eq!(read_number(&json!("-2")), Some(-2.0));
        assert_eq!(read_number(&json!("  ")), None);
        assert_eq!(read_number(&json!([1])), None);
        assert_eq!(read_number(&json!({"v": 1})), None);
        assert_eq!(read_number(&json!(false)), None);
    }

    #[test]
    fn falsy_box_field_falls_back_to_the_entry() {
        for empty in [json!(0), json!(false), json!("")] {
            let payload = json!([{ "x": 1, "y": 2, "width": 3, "boxes": empty }]);
            let highlights = normalize(&payload);

            assert_eq!(highlights.len(), 1, "box field {empty}");
            assert_eq!((highlights[0].x, highlights[0].y, highlights[0].width), (1.0, 2.0, 3.0));
        }

        // An explicit but empty list still means no boxes
        assert!(normalize(&json!([{ "x": 1, "y": 2, "boxes": [] }])).is_empty());
    }
}
