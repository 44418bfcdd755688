//! Scripted render engine for exercising the pipeline without a PDF library

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use flume::{Receiver, Sender};

use crate::preview::{EngineDocument, PageImage, PageSize, RenderEngine, WorkerFault};

const PDF_HEADER: &[u8] = b"%PDF";

/// Bytes the scripted engine accepts as a document
#[must_use]
pub fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.7\n% scripted test document\n".to_vec()
}

/// Distinct document bytes, for engines scripted with several documents
#[must_use]
pub fn named_pdf_bytes(name: &str) -> Vec<u8> {
    format!("%PDF-1.7\n% {name}\n").into_bytes()
}

/// Holds one render of a page until released or dropped
pub struct RenderGate {
    release: Sender<()>,
}

impl RenderGate {
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

/// Shared between the engine and every document it opens
#[derive(Default)]
struct Script {
    pages: Vec<PageSize>,
    /// Page sizes of documents opened from exactly these bytes
    documents: Vec<(Vec<u8>, Vec<PageSize>)>,
    failing_pages: HashSet<u32>,
    fail_next: Mutex<HashSet<u32>>,
    open_error: Option<String>,
    gates: Mutex<HashMap<u32, VecDeque<Receiver<()>>>>,
    renders: AtomicUsize,
}

impl Script {
    fn take_gate(&self, page: u32) -> Option<Receiver<()>> {
        self.gates
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get_mut(&page)
            .and_then(VecDeque::pop_front)
    }

    fn take_failure(&self, page: u32) -> bool {
        self.failing_pages.contains(&page)
            || self
                .fail_next
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .remove(&page)
    }

    fn pages_for(&self, bytes: &[u8]) -> Vec<PageSize> {
        self.documents
            .iter()
            .find(|(doc, _)| doc.as_slice() == bytes)
            .map_or_else(|| self.pages.clone(), |(_, pages)| pages.clone())
    }
}

/// In-memory engine with scripted pages, failures and render gates
#[derive(Default)]
pub struct ScriptedEngine {
    script: Arc<Script>,
}

impl ScriptedEngine {
    /// `count` pages of identical size
    #[must_use]
    pub fn with_pages(count: u32, size: PageSize) -> Self {
        Self::with_page_sizes((0..count).map(|_| size).collect())
    }

    #[must_use]
    pub fn with_page_sizes(pages: Vec<PageSize>) -> Self {
        Self {
            script: Arc::new(Script {
                pages,
                ..Script::default()
            }),
        }
    }

    /// Documents opened from `bytes` get `pages` instead of the default pages
    #[must_use]
    pub fn with_document(mut self, bytes: Vec<u8>, pages: Vec<PageSize>) -> Self {
        if let Some(script) = Arc::get_mut(&mut self.script) {
            script.documents.push((bytes, pages));
        }
        self
    }

    /// Every render of `page` fails
    #[must_use]
    pub fn failing_page(mut self, page: u32) -> Self {
        if let Some(script) = Arc::get_mut(&mut self.script) {
            script.failing_pages.insert(page);
        }
        self
    }

    /// Opening any document fails with `reason`
    #[must_use]
    pub fn failing_open(mut self, reason: &str) -> Self {
        if let Some(script) = Arc::get_mut(&mut self.script) {
            script.open_error = Some(reason.to_string());
        }
        self
    }

    /// Block the next rasterization of `page` until the gate is released.
    ///
    /// Must be called before the render is requested.
    pub fn hold_next_render(&self, page: u32) -> RenderGate {
        let (release, wait) = flume::bounded(1);
        self.script
            .gates
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(page)
            .or_default()
            .push_back(wait);
        RenderGate { release }
    }

    /// Fail only the next rasterization of `page`
    pub fn fail_next_render(&self, page: u32) {
        self.script
            .fail_next
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(page);
    }

    /// Number of rasterizations started so far
    #[must_use]
    pub fn render_count(&self) -> usize {
        self.script.renders.load(Ordering::SeqCst)
    }
}

impl RenderEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn open(&self, bytes: &[u8]) -> Result<Box<dyn EngineDocument>, WorkerFault> {
        if let Some(reason) = &self.script.open_error {
            return Err(WorkerFault::generic(reason.clone()));
        }
        if !bytes.starts_with(PDF_HEADER) {
            return Err(WorkerFault::generic("not a PDF document"));
        }
        Ok(Box::new(ScriptedDocument {
            pages: self.script.pages_for(bytes),
            script: Arc::clone(&self.script),
        }))
    }
}

struct ScriptedDocument {
    pages: Vec<PageSize>,
    script: Arc<Script>,
}

impl ScriptedDocument {
    fn size(&self, page: u32) -> Result<PageSize, WorkerFault> {
        let page_count = self.page_count()?;
        page.checked_sub(1)
            .and_then(|index| self.pages.get(index as usize))
            .copied()
            .ok_or(WorkerFault::PageOutOfRange { page, page_count })
    }
}

impl EngineDocument for ScriptedDocument {
    fn page_count(&self) -> Result<u32, WorkerFault> {
        Ok(self.pages.len() as u32)
    }

    fn page_size(&self, page: u32) -> Result<PageSize, WorkerFault> {
        self.size(page)
    }

    fn rasterize(&self, page: u32, target: PageSize) -> Result<PageImage, WorkerFault> {
        self.size(page)?;
        self.script.renders.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = self.script.take_gate(page) {
            // Released or dropped, either way the render proceeds
            let _ = gate.recv();
        }

        if self.script.take_failure(page) {
            return Err(WorkerFault::generic(format!("scripted failure on page {page}")));
        }

        let width_px = target.width.ceil().max(1.0) as u32;
        let height_px = target.height.ceil().max(1.0) as u32;
        Ok(PageImage {
            pixels: vec![255; (width_px * height_px * 3) as usize],
            width_px,
            height_px,
        })
    }
}
