//! Document loader and page render workers - run in separate threads

use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};
use log::{debug, warn};

use super::cache::{CacheKey, PageCache};
use super::cancel::CancellationToken;
use super::engine::{EngineDocument, RenderEngine};
use super::metrics::rendered_size;
use super::request::{RenderParams, RenderRequest, RenderResponse, RequestId, WorkerFault};
use super::types::RenderedPage;
use crate::source::DocumentSource;

/// Resolve the source, open it once and report the page count.
///
/// The resolved bytes travel back with the page count so render workers can
/// open their own handles without touching the source again.
pub fn load_document(
    id: RequestId,
    engine: &dyn RenderEngine,
    source: &DocumentSource,
    responses: &Sender<RenderResponse>,
) {
    let response = match open_document(engine, source) {
        Ok((page_count, bytes)) => RenderResponse::DocumentInfo {
            id,
            page_count,
            bytes,
        },
        Err(reason) => RenderResponse::LoadFailed { id, reason },
    };
    // The receiver is gone when the document was replaced meanwhile
    let _ = responses.send(response);
}

fn open_document(
    engine: &dyn RenderEngine,
    source: &DocumentSource,
) -> Result<(u32, Arc<[u8]>), String> {
    let bytes = source.resolve().map_err(|e| e.to_string())?;
    let doc = engine.open(&bytes).map_err(|e| e.to_string())?;
    let page_count = doc.page_count().map_err(|e| e.to_string())?;
    if page_count == 0 {
        return Err("document has no pages".to_string());
    }
    Ok((page_count, bytes))
}

pub fn render_worker(
    engine: Arc<dyn RenderEngine>,
    bytes: Arc<[u8]>,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
    cache: Arc<Mutex<PageCache>>,
) {
    let doc = match engine.open(&bytes) {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!("Render worker could not open document: {e}");
            None
        }
    };

    for request in requests {
        match request {
            RenderRequest::Page {
                id,
                page,
                params,
                token,
            } => {
                let response = match &doc {
                    Some(doc) => handle_page_request(doc.as_ref(), id, page, &params, &token, &cache),
                    None => RenderResponse::Error {
                        id,
                        page,
                        error: WorkerFault::generic("document unavailable in render worker"),
                    },
                };
                if responses.send(response).is_err() {
                    break;
                }
            }

            RenderRequest::Shutdown => break,
        }
    }
}

fn handle_page_request(
    doc: &dyn EngineDocument,
    id: RequestId,
    page: u32,
    params: &RenderParams,
    token: &CancellationToken,
    cache: &Arc<Mutex<PageCache>>,
) -> RenderResponse {
    if token.is_cancelled() {
        return RenderResponse::Cancelled { id, page };
    }

    let key = CacheKey::from_params(page, params);
    let cached = cache
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get(&key);
    if let Some(data) = cached {
        return RenderResponse::Page { id, page, data };
    }

    let data = match render_page(doc, page, params) {
        Ok(data) => data,
        Err(error) => return RenderResponse::Error { id, page, error },
    };

    let data = cache
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .insert(key, data);

    // The raster is still valid for its width, so it stays cached
    if token.is_cancelled() {
        debug!("Render {id:?} of page {page} finished after cancellation");
        return RenderResponse::Cancelled { id, page };
    }

    RenderResponse::Page { id, page, data }
}

/// Render a single page at the requested width
pub fn render_page(
    doc: &dyn EngineDocument,
    page: u32,
    params: &RenderParams,
) -> Result<RenderedPage, WorkerFault> {
    let original = doc.page_size(page)?;
    if !original.is_usable() {
        return Err(WorkerFault::generic(format!(
            "page {page} has unusable size {}x{}",
            original.width, original.height
        )));
    }

    let rendered = rendered_size(original, params.target_width);
    let image = doc.rasterize(page, rendered)?;

    Ok(RenderedPage {
        page,
        original,
        rendered,
        image,
    })
}
