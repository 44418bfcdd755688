//! Highlight overlays for extracted documents
//!
//! Normalizes loosely shaped highlight payloads, renders document pages on
//! background workers and maps every highlight into the pixel space of the
//! page it belongs to.

pub mod compositor;
pub mod highlights;
pub mod overlay;
pub mod panic_handler;
pub mod preview;
pub mod session;
pub mod settings;
pub mod source;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use compositor::{OverlayBox, RenderedBox, compose, mark_active};
pub use highlights::{NormalizedHighlight, PageHighlightIndex, group_by_page, normalize};
pub use session::{PageFrame, PreviewSession, PreviewStatus};
pub use settings::Settings;
pub use source::{DocumentSource, SourceError};
