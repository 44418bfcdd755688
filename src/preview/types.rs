//! Core types for page rendering

use serde::Serialize;

/// Page dimensions in engine units
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Both sides finite and strictly positive
    #[must_use]
    pub fn is_usable(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Raw rasterized page.
///
/// RGB pixel data, 3 bytes per pixel, rows packed without padding.
#[derive(Clone)]
pub struct PageImage {
    pub pixels: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl std::fmt::Debug for PageImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageImage")
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Complete output of one page render
#[derive(Clone, Debug)]
pub struct RenderedPage {
    /// Page number (1-based)
    pub page: u32,
    /// Intrinsic page size at scale 1.0
    pub original: PageSize,
    /// On-screen size the page was rendered at
    pub rendered: PageSize,
    /// Rasterized surface
    pub image: PageImage,
}
