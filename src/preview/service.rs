//! Render service - owns the pipeline state, worker pool and committed results

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, trace, warn};

use super::cache::PageCache;
use super::engine::RenderEngine;
use super::metrics::{PageViewportMetrics, ViewportMetricsTracker, WidthPolicy};
use super::registry::TaskRegistry;
use super::request::{RenderParams, RenderRequest, RenderResponse, RequestId};
use super::state::{Command, Effect, Phase, PipelineState, RenderPolicy};
use super::types::RenderedPage;
use super::worker::{load_document, render_worker};
use super::{DEFAULT_CACHE_SIZE, DEFAULT_WORKERS};
use crate::source::DocumentSource;

/// Configuration consumed by [`RenderService`]
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub width_policy: WidthPolicy,
    pub render_policy: RenderPolicy,
    pub workers: usize,
    pub cache_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width_policy: WidthPolicy::default(),
            render_policy: RenderPolicy::default(),
            workers: DEFAULT_WORKERS,
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

/// Render status of a single page
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageStatus {
    Rendering,
    Rendered,
    Failed(String),
}

/// Committed changes reported to the presentation layer.
///
/// Cancelled and superseded work never produces an event.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    DocumentLoaded { page_count: u32 },
    LoadFailed { reason: String },
    PageRendered { page: u32 },
    PageFailed { page: u32, reason: String },
}

/// Manages document loading and page rendering with worker threads.
///
/// All state lives on the thread that owns the service and is only changed
/// while handling a command or a worker response. Worker results commit only
/// if their request is still the live task for the page.
pub struct RenderService {
    engine: Arc<dyn RenderEngine>,
    config: PipelineConfig,
    state: PipelineState,
    source: Option<DocumentSource>,
    document_bytes: Option<Arc<[u8]>>,
    request_tx: Option<Sender<RenderRequest>>,
    response_tx: Sender<RenderResponse>,
    response_rx: Receiver<RenderResponse>,
    num_workers: usize,
    next_request_id: u64,
    load_request: Option<RequestId>,
    registry: TaskRegistry,
    metrics: ViewportMetricsTracker,
    surfaces: HashMap<u32, Arc<RenderedPage>>,
    page_status: HashMap<u32, PageStatus>,
    cache: Arc<Mutex<PageCache>>,
}

impl RenderService {
    /// Create an idle service. No threads are started until a document opens.
    #[must_use]
    pub fn new(engine: Arc<dyn RenderEngine>, config: PipelineConfig) -> Self {
        let (response_tx, response_rx) = flume::unbounded();
        let cache = Arc::new(Mutex::new(PageCache::new(config.cache_size)));
        let state = PipelineState::new(config.render_policy, config.width_policy);

        Self {
            engine,
            config,
            state,
            source: None,
            document_bytes: None,
            request_tx: None,
            response_tx,
            response_rx,
            num_workers: 0,
            next_request_id: 1,
            load_request: None,
            registry: TaskRegistry::new(),
            metrics: ViewportMetricsTracker::new(),
            surfaces: HashMap::new(),
            page_status: HashMap::new(),
            cache,
        }
    }

    /// Start loading a document, replacing the current one
    pub fn open(&mut self, source: DocumentSource) {
        info!("Opening document {}", source.describe());
        self.source = Some(source);
        self.apply_command(Command::Open);
    }

    /// Report the measured width of the hosting container
    pub fn set_container_width(&mut self, width: f32) {
        self.apply_command(Command::SetContainerWidth(width));
    }

    /// Report which pages are currently visible
    pub fn set_visible_pages(&mut self, pages: impl IntoIterator<Item = u32>) {
        self.apply_command(Command::SetVisiblePages(pages.into_iter().collect()));
    }

    /// Force a fresh render of one page
    pub fn request_rerender(&mut self, page: u32) {
        self.apply_command(Command::PageNeedsRerender(page));
    }

    /// Cancel all work and release the document
    pub fn teardown(&mut self) {
        self.apply_command(Command::Teardown);
        self.source = None;
    }

    /// Apply a command to the pipeline state
    pub fn apply_command(&mut self, cmd: Command) {
        let effects = self.state.apply(cmd);
        self.execute_effects(effects);
    }

    fn execute_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CancelAll => {
                    let cancelled = self.registry.cancel_all();
                    if cancelled > 0 {
                        debug!("Cancelled {cancelled} in-flight renders");
                    }
                    self.page_status
                        .retain(|_, status| *status != PageStatus::Rendering);
                }

                Effect::ClearDocument => self.clear_document(),

                Effect::SpawnLoader => self.spawn_loader(),

                Effect::SpawnWorkers => self.spawn_workers(),

                Effect::RenderPage(page) => {
                    self.request_page(page);
                }

                Effect::EnsurePage(page) => {
                    self.request_page_if_needed(page);
                }

                Effect::CancelPage(page) => {
                    if self.registry.cancel(page) {
                        debug!("Cancelled render of page {page} (left view)");
                        self.page_status.remove(&page);
                    }
                }
            }
        }
    }

    fn clear_document(&mut self) {
        self.shutdown_workers();
        self.request_tx = None;
        self.document_bytes = None;
        self.load_request = None;

        // Anything still travelling on the old channel belongs to the old document
        let (response_tx, response_rx) = flume::unbounded();
        self.response_tx = response_tx;
        self.response_rx = response_rx;

        self.metrics.clear();
        self.surfaces.clear();
        self.page_status.clear();

        // Workers of the old document may still insert into the cache they hold
        self.cache = Arc::new(Mutex::new(PageCache::new(self.config.cache_size)));
    }

    fn spawn_loader(&mut self) {
        let Some(source) = self.source.clone() else {
            warn!("Load requested without a document source");
            return;
        };

        let id = self.next_id();
        self.load_request = Some(id);

        let engine = Arc::clone(&self.engine);
        let responses = self.response_tx.clone();
        std::thread::spawn(move || {
            load_document(id, engine.as_ref(), &source, &responses);
        });
    }

    fn spawn_workers(&mut self) {
        let Some(bytes) = self.document_bytes.clone() else {
            warn!("Workers requested before document bytes were available");
            return;
        };

        let page_count = self.state.page_count().unwrap_or(1) as usize;
        let num_workers = self.config.workers.clamp(1, page_count.max(1));

        // Fan-out over a shared MPMC request queue
        let (request_tx, request_rx) = flume::unbounded();
        for _ in 0..num_workers {
            let engine = Arc::clone(&self.engine);
            let bytes = Arc::clone(&bytes);
            let rx = request_rx.clone();
            let tx = self.response_tx.clone();
            let cache = Arc::clone(&self.cache);

            std::thread::spawn(move || {
                render_worker(engine, bytes, rx, tx, cache);
            });
        }

        debug!(
            "Started {num_workers} {} render workers",
            self.engine.name()
        );
        self.request_tx = Some(request_tx);
        self.num_workers = num_workers;
    }

    /// Request a page to be rendered at the current target width.
    ///
    /// Supersedes any render of the page that is still in flight. Returns
    /// `None` when no document is loaded or the page is out of range.
    pub fn request_page(&mut self, page: u32) -> Option<RequestId> {
        let page_count = self.state.page_count()?;
        if page == 0 || page > page_count {
            return None;
        }
        let request_tx = self.request_tx.clone()?;

        let id = self.next_id();
        let token = self.registry.start(page, id);
        let params = RenderParams {
            target_width: self.state.target_width,
        };

        if request_tx
            .send(RenderRequest::Page {
                id,
                page,
                params,
                token,
            })
            .is_err()
        {
            warn!("Render workers are gone, page {page} not requested");
            self.registry.cancel(page);
            return None;
        }

        self.page_status.insert(page, PageStatus::Rendering);
        Some(id)
    }

    /// Request a page only if it is not already current or in flight
    pub fn request_page_if_needed(&mut self, page: u32) -> Option<RequestId> {
        if self.registry.in_flight(page) || self.metrics.is_current(page, self.state.target_width)
        {
            return None;
        }
        self.request_page(page)
    }

    /// Commit every response that has already arrived
    pub fn poll_responses(&mut self) -> Vec<PipelineEvent> {
        let mut events = vec![];
        while let Ok(response) = self.response_rx.try_recv() {
            events.extend(self.handle_response(response));
        }
        events
    }

    /// Block until at least one response arrives or `timeout` passes, then
    /// commit everything that is ready
    pub fn wait_for_events(&mut self, timeout: Duration) -> Vec<PipelineEvent> {
        let mut events = vec![];
        match self.response_rx.recv_timeout(timeout) {
            Ok(response) => events.extend(self.handle_response(response)),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return events,
        }
        events.extend(self.poll_responses());
        events
    }

    /// Keep committing responses until nothing is loading or in flight
    pub fn run_until_settled(&mut self, timeout: Duration) -> Vec<PipelineEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = vec![];

        while !self.is_settled() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(
                    "Pipeline not settled after {timeout:?}: {} renders in flight",
                    self.registry.len()
                );
                break;
            }
            events.extend(self.wait_for_events(remaining));
        }

        events
    }

    /// Nothing loading and no render in flight
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state.phase != Phase::Loading && self.registry.is_empty()
    }

    fn handle_response(&mut self, response: RenderResponse) -> Option<PipelineEvent> {
        match response {
            RenderResponse::DocumentInfo {
                id,
                page_count,
                bytes,
            } => {
                if self.load_request != Some(id) {
                    debug!("Discarding stale document info {id:?}");
                    return None;
                }
                self.load_request = None;
                info!("Document loaded with {page_count} pages");
                self.document_bytes = Some(bytes);
                self.apply_command(Command::DocumentLoaded(page_count));
                Some(PipelineEvent::DocumentLoaded { page_count })
            }

            RenderResponse::LoadFailed { id, reason } => {
                if self.load_request != Some(id) {
                    debug!("Discarding stale load failure {id:?}");
                    return None;
                }
                self.load_request = None;
                error!("Unable to load document: {reason}");
                self.apply_command(Command::LoadFailed(reason.clone()));
                Some(PipelineEvent::LoadFailed { reason })
            }

            RenderResponse::Page { id, page, data } => {
                if !self.registry.finish(page, id) {
                    debug!("Discarding stale render {id:?} of page {page}");
                    return None;
                }
                self.metrics
                    .record_page_render(page, data.original, data.rendered);
                self.surfaces.insert(page, data);
                self.page_status.insert(page, PageStatus::Rendered);
                Some(PipelineEvent::PageRendered { page })
            }

            RenderResponse::Cancelled { id, page } => {
                trace!("Render {id:?} of page {page} cancelled");
                if self.registry.finish(page, id) {
                    self.page_status.remove(&page);
                }
                None
            }

            RenderResponse::Error { id, page, error } => {
                if !self.registry.finish(page, id) {
                    debug!("Discarding stale render failure {id:?} of page {page}");
                    return None;
                }
                let reason = error.to_string();
                warn!("Failed to render page {page}: {reason}");
                self.metrics.remove(page);
                self.surfaces.remove(&page);
                self.page_status
                    .insert(page, PageStatus::Failed(reason.clone()));
                Some(PipelineEvent::PageFailed { page, reason })
            }
        }
    }

    /// Get current pipeline state
    #[must_use]
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    #[must_use]
    pub fn phase(&self) -> &Phase {
        &self.state.phase
    }

    #[must_use]
    pub fn page_count(&self) -> Option<u32> {
        self.state.page_count()
    }

    #[must_use]
    pub fn target_width(&self) -> f32 {
        self.state.target_width
    }

    /// Committed metrics for a page
    #[must_use]
    pub fn metrics(&self, page: u32) -> Option<&PageViewportMetrics> {
        self.metrics.metrics(page)
    }

    /// Last committed surface of a page
    #[must_use]
    pub fn surface(&self, page: u32) -> Option<Arc<RenderedPage>> {
        self.surfaces.get(&page).cloned()
    }

    #[must_use]
    pub fn page_status(&self, page: u32) -> Option<&PageStatus> {
        self.page_status.get(&page)
    }

    /// Pages with a render in flight, ascending
    #[must_use]
    pub fn in_flight_pages(&self) -> Vec<u32> {
        self.registry.pages()
    }

    fn shutdown_workers(&mut self) {
        if let Some(request_tx) = &self.request_tx {
            for _ in 0..self.num_workers {
                let _ = request_tx.send(RenderRequest::Shutdown);
            }
        }
        self.num_workers = 0;
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        self.teardown();
    }
}
