use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use simplelog::{Config, LevelFilter, WriteLogger};

use extractview::compositor::OverlayBox;
use extractview::overlay::{page_image_to_rgb, paint_overlay};
use extractview::panic_handler::initialize_panic_handler;
use extractview::preview::{PageStatus, PageViewportMetrics, RenderEngine};
use extractview::session::{PageFrame, PreviewSession, PreviewStatus};
use extractview::settings::Settings;
use extractview::source::DocumentSource;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    long_about = "Render a document and map extracted highlights onto its pages.",
    arg_required_else_help = true
)]
pub struct Args {
    /// Document to preview: a file path, file:// URL or base64 data: URL
    #[clap(short, long)]
    pub document: String,

    /// JSON file with highlight data, or an extraction result containing it
    #[clap(long)]
    pub highlights: Option<PathBuf>,

    /// Width of the hosting container in pixels. Unmeasured when omitted.
    #[clap(short, long)]
    pub width: Option<f32>,

    /// Highlight id drawn as the active box
    #[clap(short, long)]
    pub active: Option<String>,

    /// Directory to write page-<n>.png previews with overlays into
    #[clap(short, long)]
    pub export: Option<PathBuf>,

    /// Settings file. Defaults to the user config directory.
    #[clap(long)]
    pub config: Option<PathBuf>,

    #[clap(long, default_value = "extractview.log")]
    pub log_file: PathBuf,

    #[clap(long, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,

    /// Give up waiting for renders after this many milliseconds
    #[clap(long, default_value_t = 30_000)]
    pub timeout_ms: u64,
}

#[derive(Serialize)]
struct PageReport<'a> {
    page: u32,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    metrics: Option<PageViewportMetrics>,
    boxes: &'a [OverlayBox],
}

impl<'a> PageReport<'a> {
    fn from_frame(frame: &'a PageFrame) -> Self {
        let (status, error) = match &frame.status {
            Some(PageStatus::Rendered) => ("rendered", None),
            Some(PageStatus::Rendering) => ("rendering", None),
            Some(PageStatus::Failed(reason)) => ("failed", Some(reason.as_str())),
            None => ("pending", None),
        };
        Self {
            page: frame.page,
            status,
            error,
            metrics: frame.metrics,
            boxes: &frame.boxes,
        }
    }
}

#[cfg(feature = "pdf")]
fn create_engine() -> Result<Arc<dyn RenderEngine>> {
    Ok(Arc::new(extractview::preview::MuPdfEngine::new()))
}

#[cfg(not(feature = "pdf"))]
fn create_engine() -> Result<Arc<dyn RenderEngine>> {
    bail!("built without a render engine; enable the `pdf` feature")
}

/// Accept either the raw highlight mapping or an extraction result
/// (`{"text": ..., "highlights": ..., "whisper_hash": ...}`) wrapping it
fn highlight_payload(value: Value) -> Value {
    match value {
        Value::Object(mut map)
            if map.contains_key("highlights")
                && (map.contains_key("text") || map.contains_key("whisper_hash")) =>
        {
            map.remove("highlights").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn read_highlights(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read highlights from {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    Ok(highlight_payload(value))
}

fn export_pages(session: &PreviewSession, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    for frame in session.frames() {
        let Some(surface) = &frame.surface else {
            warn!("Page {} has no surface, not exported", frame.page);
            continue;
        };
        let Some(mut canvas) = page_image_to_rgb(&surface.image) else {
            warn!("Page {} surface has an unexpected size", frame.page);
            continue;
        };
        paint_overlay(&mut canvas, &frame.boxes);

        let path = dir.join(format!("page-{}.png", frame.page));
        canvas
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Exported {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    WriteLogger::init(
        args.log_level,
        Config::default(),
        File::create(&args.log_file)
            .with_context(|| format!("Failed to create {}", args.log_file.display()))?,
    )?;
    initialize_panic_handler();

    info!("Starting extractview");

    let settings = Settings::load(args.config.as_deref())?;
    let engine = create_engine()?;
    let source = DocumentSource::from_reference(&args.document)?;

    let mut session = PreviewSession::new(engine, settings.pipeline_config());
    if let Some(path) = &args.highlights {
        let payload = read_highlights(path)?;
        let count = session.set_highlights(&payload);
        info!("{count} highlights on {} pages", session.highlights().pages().len());
    }
    session.set_active_id(args.active.clone());
    if let Some(width) = args.width {
        session.set_container_width(width);
    }

    session.open(source);
    session.run_until_settled(Duration::from_millis(args.timeout_ms));

    match session.status() {
        PreviewStatus::Ready { page_count } => info!("Preview ready, {page_count} pages"),
        PreviewStatus::Unavailable { reason } => bail!("Unable to load preview: {reason}"),
        PreviewStatus::Loading => bail!("Document still loading after {}ms", args.timeout_ms),
        PreviewStatus::NoDocument => bail!("No document to preview"),
    }

    let frames = session.frames();
    let report: Vec<PageReport<'_>> = frames.iter().map(PageReport::from_frame).collect();
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(dir) = &args.export {
        export_pages(&session, dir)?;
    }

    session.close();
    info!("Shutting down extractview");
    Ok(())
}
