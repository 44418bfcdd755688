//! Per-page viewport metrics
//!
//! A page's overlay transform is the ratio between the size it was actually
//! rendered at and its intrinsic size. The rendered width follows the host
//! container, clamped to a readable range; the height always follows the
//! page's aspect ratio.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::PageSize;

/// How the container width maps to a page display width
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WidthPolicy {
    /// Narrowest page width
    pub min_width: f32,
    /// Widest page width
    pub max_width: f32,
    /// Used while the container has not been measured yet
    pub fallback_width: f32,
    /// Horizontal padding subtracted from the container width
    pub gutter: f32,
}

impl WidthPolicy {
    pub const DEFAULT_MIN_WIDTH: f32 = 280.0;
    pub const DEFAULT_MAX_WIDTH: f32 = 900.0;
    pub const DEFAULT_FALLBACK_WIDTH: f32 = 640.0;
    pub const DEFAULT_GUTTER: f32 = 16.0;
}

impl Default for WidthPolicy {
    fn default() -> Self {
        Self {
            min_width: Self::DEFAULT_MIN_WIDTH,
            max_width: Self::DEFAULT_MAX_WIDTH,
            fallback_width: Self::DEFAULT_FALLBACK_WIDTH,
            gutter: Self::DEFAULT_GUTTER,
        }
    }
}

/// Width pages should be drawn at for a measured container width.
///
/// Unmeasured (non-positive or non-finite) containers fall back to the
/// policy's fallback width. The result is always within `[min, max]`.
#[must_use]
pub fn target_display_width(container_width: f32, policy: &WidthPolicy) -> f32 {
    let computed = if container_width.is_finite() && container_width > 0.0 {
        container_width - policy.gutter
    } else {
        policy.fallback_width
    };
    computed.min(policy.max_width).max(policy.min_width)
}

/// Size of a page drawn at `target_width`, preserving its aspect ratio.
///
/// A non-positive target keeps the intrinsic width.
#[must_use]
pub fn rendered_size(original: PageSize, target_width: f32) -> PageSize {
    let width = if target_width > 0.0 {
        target_width
    } else {
        original.width
    };
    let scale = width / original.width;
    PageSize::new(width, original.height * scale)
}

/// Intrinsic and rendered size of one page
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PageViewportMetrics {
    pub original_width: f32,
    pub original_height: f32,
    pub rendered_width: f32,
    pub rendered_height: f32,
}

impl PageViewportMetrics {
    #[must_use]
    pub fn new(original: PageSize, rendered: PageSize) -> Self {
        Self {
            original_width: original.width,
            original_height: original.height,
            rendered_width: rendered.width,
            rendered_height: rendered.height,
        }
    }

    #[must_use]
    pub fn scale_x(&self) -> f64 {
        f64::from(self.rendered_width) / f64::from(self.original_width)
    }

    #[must_use]
    pub fn scale_y(&self) -> f64 {
        f64::from(self.rendered_height) / f64::from(self.original_height)
    }
}

/// Committed metrics for every page rendered in the current session
#[derive(Debug, Default)]
pub struct ViewportMetricsTracker {
    by_page: HashMap<u32, PageViewportMetrics>,
}

impl ViewportMetricsTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed render, replacing any previous entry for the page
    pub fn record_page_render(&mut self, page: u32, original: PageSize, rendered: PageSize) {
        self.by_page
            .insert(page, PageViewportMetrics::new(original, rendered));
    }

    #[must_use]
    pub fn metrics(&self, page: u32) -> Option<&PageViewportMetrics> {
        self.by_page.get(&page)
    }

    /// Whether the page's committed render matches `target_width`
    #[must_use]
    pub fn is_current(&self, page: u32, target_width: f32) -> bool {
        self.by_page
            .get(&page)
            .is_some_and(|m| (m.rendered_width - target_width).abs() <= f32::EPSILON)
    }

    /// Forget a page, e.g. after its render failed
    pub fn remove(&mut self, page: u32) -> Option<PageViewportMetrics> {
        self.by_page.remove(&page)
    }

    pub fn clear(&mut self) {
        self.by_page.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_page.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_page.is_empty()
    }
}
