//! Rendering engine boundary
//!
//! The engine is created once per process and handed to the render service
//! as an `Arc<dyn RenderEngine>`. Every loader and worker thread opens its
//! own [`EngineDocument`] from the shared document bytes, so document
//! handles never cross threads.

use super::request::WorkerFault;
use super::types::{PageImage, PageSize};

/// Factory for per-thread document handles
pub trait RenderEngine: Send + Sync {
    /// Short engine name for logs
    fn name(&self) -> &'static str;

    /// Parse a document from raw bytes
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn EngineDocument>, WorkerFault>;
}

/// An opened document, owned by a single thread
pub trait EngineDocument {
    fn page_count(&self) -> Result<u32, WorkerFault>;

    /// Intrinsic size of a 1-based page at scale 1.0
    fn page_size(&self, page: u32) -> Result<PageSize, WorkerFault>;

    /// Rasterize a 1-based page so that it covers `target`
    fn rasterize(&self, page: u32, target: PageSize) -> Result<PageImage, WorkerFault>;
}

#[cfg(feature = "pdf")]
pub use mupdf_engine::MuPdfEngine;

#[cfg(feature = "pdf")]
mod mupdf_engine {
    use mupdf::{Colorspace, Document, Matrix, Page, Pixmap};

    use super::{EngineDocument, RenderEngine};
    use crate::preview::request::WorkerFault;
    use crate::preview::types::{PageImage, PageSize};

    const PDF_MAGIC: &str = "application/pdf";

    /// MuPDF-backed engine
    #[derive(Clone, Copy, Debug, Default)]
    pub struct MuPdfEngine;

    impl MuPdfEngine {
        #[must_use]
        pub fn new() -> Self {
            Self
        }
    }

    impl RenderEngine for MuPdfEngine {
        fn name(&self) -> &'static str {
            "mupdf"
        }

        fn open(&self, bytes: &[u8]) -> Result<Box<dyn EngineDocument>, WorkerFault> {
            if bytes.is_empty() {
                return Err(WorkerFault::generic("document is empty"));
            }
            let doc = Document::from_bytes(bytes, PDF_MAGIC)?;
            Ok(Box::new(MuPdfDocument { doc }))
        }
    }

    struct MuPdfDocument {
        doc: Document,
    }

    impl MuPdfDocument {
        fn load(&self, page: u32) -> Result<Page, WorkerFault> {
            let page_count = self.page_count()?;
            if page == 0 || page > page_count {
                return Err(WorkerFault::PageOutOfRange { page, page_count });
            }
            Ok(self.doc.load_page((page - 1) as i32)?)
        }
    }

    impl EngineDocument for MuPdfDocument {
        fn page_count(&self) -> Result<u32, WorkerFault> {
            let count = self.doc.page_count()?;
            Ok(u32::try_from(count).unwrap_or(0))
        }

        fn page_size(&self, page: u32) -> Result<PageSize, WorkerFault> {
            let bounds = self.load(page)?.bounds()?;
            Ok(PageSize::new(bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
        }

        fn rasterize(&self, page: u32, target: PageSize) -> Result<PageImage, WorkerFault> {
            let page = self.load(page)?;
            let bounds = page.bounds()?;
            let width = bounds.x1 - bounds.x0;
            let height = bounds.y1 - bounds.y0;
            if width <= 0.0 || height <= 0.0 {
                return Err(WorkerFault::generic(format!(
                    "degenerate page bounds {width}x{height}"
                )));
            }

            let transform = Matrix::new_scale(target.width / width, target.height / height);
            let pixmap = page.to_pixmap(&transform, &Colorspace::device_rgb(), false, false)?;
            pixmap_to_image(&pixmap)
        }
    }

    fn pixmap_to_image(pixmap: &Pixmap) -> Result<PageImage, WorkerFault> {
        let n = pixmap.n() as usize;
        if n < 3 {
            return Err(WorkerFault::generic(format!(
                "Unsupported pixmap format: {n} channels"
            )));
        }

        let width = pixmap.width() as usize;
        let height = pixmap.height() as usize;
        let stride = pixmap.stride() as usize;
        let samples = pixmap.samples();
        let row_bytes = width * n;
        if samples.len() < stride.saturating_mul(height) || row_bytes > stride {
            return Err(WorkerFault::generic("Pixmap buffer size mismatch"));
        }

        let mut pixels = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            let row_start = y * stride;
            let row = &samples[row_start..row_start + row_bytes];
            if n == 3 {
                pixels.extend_from_slice(row);
            } else {
                for px in row.chunks_exact(n) {
                    pixels.extend_from_slice(&px[..3]);
                }
            }
        }

        Ok(PageImage {
            pixels,
            width_px: pixmap.width(),
            height_px: pixmap.height(),
        })
    }
}
