//! Highlight payload handling
//!
//! Extraction backends disagree on how highlights are shaped. This module
//! turns whatever arrives into page-relative [`NormalizedHighlight`]s and
//! indexes them by page for the compositor.

mod group;
mod normalize;

pub use group::{PageHighlightIndex, group_by_page};
pub use normalize::{
    BOX_ALIASES, HEIGHT_ALIASES, PAGE_ALIASES, WIDTH_ALIASES, X_ALIASES, Y_ALIASES, normalize,
    read_number,
};

use serde::{Deserialize, Serialize};

/// A single highlight rectangle in the document's intrinsic coordinate space
/// (top-left origin, engine units at scale 1.0).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedHighlight {
    /// `<entryKey>-<boxIndex>`, stable within one normalization pass
    pub id: String,
    /// 1-based page number
    pub page_number: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}
