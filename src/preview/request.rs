//! Render request and response types

use std::sync::Arc;

use super::cancel::CancellationToken;
use super::types::RenderedPage;

/// Unique identifier for loader and render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Parameters for rendering a page
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderParams {
    /// Display width the page is scaled to, height follows the aspect ratio
    pub target_width: f32,
}

/// Request sent to render workers
#[derive(Debug)]
pub enum RenderRequest {
    /// Render a page (1-based)
    Page {
        id: RequestId,
        page: u32,
        params: RenderParams,
        token: CancellationToken,
    },

    /// Shutdown the worker
    Shutdown,
}

/// Errors from the render engine and workers
#[derive(Debug, thiserror::Error)]
pub enum WorkerFault {
    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("{detail}")]
    Generic { detail: String },
}

impl WorkerFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Response from the loader and render workers
#[derive(Debug)]
pub enum RenderResponse {
    /// Document opened, page count known
    DocumentInfo {
        id: RequestId,
        page_count: u32,
        bytes: Arc<[u8]>,
    },

    /// Document could not be resolved or opened
    LoadFailed { id: RequestId, reason: String },

    /// Rendered page data
    Page {
        id: RequestId,
        page: u32,
        data: Arc<RenderedPage>,
    },

    /// Request was cancelled before its result was produced
    Cancelled { id: RequestId, page: u32 },

    /// Error during rendering
    Error {
        id: RequestId,
        page: u32,
        error: WorkerFault,
    },
}
