//! Document view session
//!
//! Ties the highlight index to the render pipeline and produces what the
//! presentation layer draws: one [`PageFrame`] per page.

use std::sync::Arc;
use std::time::Duration;

use log::info;
use serde_json::Value;

use crate::compositor::{OverlayBox, compose, mark_active};
use crate::highlights::{PageHighlightIndex, group_by_page, normalize};
use crate::preview::{
    PageStatus, PageViewportMetrics, Phase, PipelineConfig, PipelineEvent, RenderEngine,
    RenderService, RenderedPage,
};
use crate::source::DocumentSource;

/// Preview state shown in place of the pages
#[derive(Clone, Debug, PartialEq)]
pub enum PreviewStatus {
    /// No document was provided for this session
    NoDocument,
    Loading,
    Ready { page_count: u32 },
    /// The document could not be previewed
    Unavailable { reason: String },
}

/// Everything needed to draw one page
#[derive(Clone, Debug)]
pub struct PageFrame {
    pub page: u32,
    pub status: Option<PageStatus>,
    pub surface: Option<Arc<RenderedPage>>,
    pub metrics: Option<PageViewportMetrics>,
    pub boxes: Vec<OverlayBox>,
}

pub struct PreviewSession {
    service: RenderService,
    highlights: PageHighlightIndex,
    active_id: Option<String>,
}

impl PreviewSession {
    #[must_use]
    pub fn new(engine: Arc<dyn RenderEngine>, config: PipelineConfig) -> Self {
        Self {
            service: RenderService::new(engine, config),
            highlights: PageHighlightIndex::default(),
            active_id: None,
        }
    }

    /// Replace the highlights from an extraction payload, returning how many
    /// were usable
    pub fn set_highlights(&mut self, payload: &Value) -> usize {
        let normalized = normalize(payload);
        info!("Normalized {} highlights", normalized.len());
        self.highlights = group_by_page(&normalized);
        self.highlights.len()
    }

    pub fn set_active_id(&mut self, active_id: Option<String>) {
        self.active_id = active_id;
    }

    pub fn open(&mut self, source: DocumentSource) {
        self.service.open(source);
    }

    pub fn close(&mut self) {
        self.service.teardown();
    }

    pub fn set_container_width(&mut self, width: f32) {
        self.service.set_container_width(width);
    }

    pub fn set_visible_pages(&mut self, pages: impl IntoIterator<Item = u32>) {
        self.service.set_visible_pages(pages);
    }

    pub fn poll(&mut self) -> Vec<PipelineEvent> {
        self.service.poll_responses()
    }

    pub fn wait_for_events(&mut self, timeout: Duration) -> Vec<PipelineEvent> {
        self.service.wait_for_events(timeout)
    }

    pub fn run_until_settled(&mut self, timeout: Duration) -> Vec<PipelineEvent> {
        self.service.run_until_settled(timeout)
    }

    #[must_use]
    pub fn status(&self) -> PreviewStatus {
        match self.service.phase() {
            Phase::Idle => PreviewStatus::NoDocument,
            Phase::Loading => PreviewStatus::Loading,
            Phase::Loaded { page_count } => PreviewStatus::Ready {
                page_count: *page_count,
            },
            Phase::Failed { reason } => PreviewStatus::Unavailable {
                reason: reason.clone(),
            },
        }
    }

    /// Current frame of one page. Boxes only appear once the page has
    /// committed metrics.
    #[must_use]
    pub fn frame(&self, page: u32) -> PageFrame {
        let metrics = self.service.metrics(page).copied();
        let boxes = compose(page, &self.highlights, metrics.as_ref());

        PageFrame {
            page,
            status: self.service.page_status(page).cloned(),
            surface: self.service.surface(page),
            metrics,
            boxes: mark_active(boxes, self.active_id.as_deref()),
        }
    }

    /// Frames for every page of the loaded document
    #[must_use]
    pub fn frames(&self) -> Vec<PageFrame> {
        let page_count = self.service.page_count().unwrap_or(0);
        (1..=page_count).map(|page| self.frame(page)).collect()
    }

    #[must_use]
    pub fn highlights(&self) -> &PageHighlightIndex {
        &self.highlights
    }

    #[must_use]
    pub fn service(&self) -> &RenderService {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut RenderService {
        &mut self.service
    }
}
