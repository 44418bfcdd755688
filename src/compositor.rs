//! Overlay compositor
//!
//! Maps page-local highlights into the pixel space of a rendered page.

use serde::Serialize;

use crate::highlights::PageHighlightIndex;
use crate::preview::PageViewportMetrics;

/// A highlight box in rendered-page pixels
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderedBox {
    pub id: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// A rendered box as handed to the overlay painter
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OverlayBox {
    #[serde(flatten)]
    pub rendered: RenderedBox,
    /// Drawn more prominently than the others
    pub active: bool,
}

/// Scale the highlights of `page` by the page's committed metrics.
///
/// Without metrics nothing is returned: boxes are never placed with an
/// assumed scale. Degenerate metrics (zero or non-finite scale) also yield
/// nothing.
#[must_use]
pub fn compose(
    page: u32,
    index: &PageHighlightIndex,
    metrics: Option<&PageViewportMetrics>,
) -> Vec<RenderedBox> {
    let Some(metrics) = metrics else {
        return Vec::new();
    };
    let scale_x = metrics.scale_x();
    let scale_y = metrics.scale_y();
    if !scale_x.is_finite() || !scale_y.is_finite() {
        return Vec::new();
    }

    index
        .page(page)
        .iter()
        .map(|item| RenderedBox {
            id: item.id.clone(),
            left: item.x * scale_x,
            top: item.y * scale_y,
            width: item.width * scale_x,
            height: item.height * scale_y,
        })
        .collect()
}

/// Flag the box whose id equals `active_id`
#[must_use]
pub fn mark_active(boxes: Vec<RenderedBox>, active_id: Option<&str>) -> Vec<OverlayBox> {
    boxes
        .into_iter()
        .map(|rendered| {
            let active = active_id == Some(rendered.id.as_str());
            OverlayBox { rendered, active }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlights::{NormalizedHighlight, group_by_page};
    use crate::preview::PageSize;

    fn highlight(id: &str, page_number: u32, x: f64, y: f64, width: f64, height: f64) -> NormalizedHighlight {
        NormalizedHighlight {
            id: id.to_string(),
            page_number,
            x,
            y,
            width,
            height,
        }
    }

    fn metrics(original: (f32, f32), rendered: (f32, f32)) -> PageViewportMetrics {
        PageViewportMetrics::new(
            PageSize::new(original.0, original.1),
            PageSize::new(rendered.0, rendered.1),
        )
    }

    #[test]
    fn scales_into_rendered_space() {
        let index = group_by_page(&[highlight("0-0", 1, 100.0, 200.0, 50.0, 20.0)]);
        let m = metrics((600.0, 800.0), (300.0, 400.0));

        let boxes = compose(1, &index, Some(&m));
        assert_eq!(
            boxes,
            vec![RenderedBox {
                id: "0-0".to_string(),
                left: 50.0,
                top: 100.0,
                width: 25.0,
                height: 10.0,
            }]
        );
    }

    #[test]
    fn nothing_without_metrics() {
        let index = group_by_page(&[highlight("0-0", 2, 1.0, 1.0, 1.0, 1.0)]);
        assert!(compose(2, &index, None).is_empty());
    }

    #[test]
    fn only_the_requested_page_is_composed() {
        let index = group_by_page(&[
            highlight("a", 1, 10.0, 10.0, 1.0, 1.0),
            highlight("b", 2, 20.0, 20.0, 1.0, 1.0),
        ]);
        let m = metrics((100.0, 100.0), (200.0, 200.0));

        let ids: Vec<String> = compose(2, &index, Some(&m)).into_iter().map(|b| b.id).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn degenerate_metrics_compose_nothing() {
        let index = group_by_page(&[highlight("a", 1, 10.0, 10.0, 1.0, 1.0)]);
        let m = metrics((0.0, 0.0), (300.0, 400.0));
        assert!(compose(1, &index, Some(&m)).is_empty());
    }

    #[test]
    fn zero_sized_highlight_stays_zero_sized() {
        let index = group_by_page(&[highlight("a", 1, 10.0, 10.0, 0.0, 0.0)]);
        let m = metrics((100.0, 100.0), (50.0, 50.0));
        let boxes = compose(1, &index, Some(&m));

        assert_eq!((boxes[0].width, boxes[0].height), (0.0, 0.0));
    }

    #[test]
    fn marks_only_the_active_box() {
        let index = group_by_page(&[
            highlight("a", 1, 0.0, 0.0, 1.0, 1.0),
            highlight("b", 1, 0.0, 0.0, 1.0, 1.0),
        ]);
        let m = metrics((1.0, 1.0), (1.0, 1.0));

        let overlay = mark_active(compose(1, &index, Some(&m)), Some("b"));
        let flags: Vec<bool> = overlay.iter().map(|b| b.active).collect();
        assert_eq!(flags, vec![false, true]);

        let none_active = mark_active(compose(1, &index, Some(&m)), None);
        assert!(none_active.iter().all(|b| !b.active));
    }
}
