//! Document render pipeline
//!
//! Loads a document in the background, renders its pages on worker threads
//! at a width derived from the host container, and commits per-page viewport
//! metrics. At most one render per page is live; superseded and cancelled
//! work is dropped before it can touch committed state.

mod cache;
mod cancel;
mod engine;
mod metrics;
mod registry;
mod request;
mod service;
mod state;
mod types;
mod worker;

pub use cache::{CacheKey, PageCache};
pub use cancel::CancellationToken;
#[cfg(feature = "pdf")]
pub use engine::MuPdfEngine;
pub use engine::{EngineDocument, RenderEngine};
pub use metrics::{
    PageViewportMetrics, ViewportMetricsTracker, WidthPolicy, rendered_size, target_display_width,
};
pub use registry::TaskRegistry;
pub use request::{RenderParams, RenderRequest, RenderResponse, RequestId, WorkerFault};
pub use service::{PageStatus, PipelineConfig, PipelineEvent, RenderService};
pub use state::{Command, Effect, Phase, PipelineState, RenderPolicy};
pub use types::*;
pub use worker::render_page;

/// Render worker threads per document
pub const DEFAULT_WORKERS: usize = 2;
/// Rendered pages kept across width changes
pub const DEFAULT_CACHE_SIZE: usize = 32;
