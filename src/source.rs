//! Document sources handed to the render pipeline

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

const DATA_URL_PREFIX: &str = "data:";
const FILE_URL_PREFIX: &str = "file://";
const BASE64_MARKER: &str = ";base64";

/// Errors resolving a document source to bytes
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed data URL: {0}")]
    InvalidDataUrl(String),

    #[error("data URL payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("remote document {0} must be fetched by the host")]
    Remote(String),

    #[error("document source is empty")]
    Empty,
}

/// Where the document bytes come from
#[derive(Clone)]
pub enum DocumentSource {
    /// Bytes already in memory
    Bytes(Arc<[u8]>),
    /// A file on disk
    Path(PathBuf),
    /// A `data:` URL with a base64 payload
    DataUrl(String),
}

impl DocumentSource {
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Classify a textual reference: `data:` URL, `file://` URL or plain path.
    ///
    /// `http(s)` references are rejected; fetching them belongs to the host.
    pub fn from_reference(reference: &str) -> Result<Self, SourceError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(SourceError::Empty);
        }
        if reference.starts_with(DATA_URL_PREFIX) {
            return Ok(Self::DataUrl(reference.to_string()));
        }
        if let Some(path) = reference.strip_prefix(FILE_URL_PREFIX) {
            return Ok(Self::Path(PathBuf::from(path)));
        }
        let lowered = reference.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            return Err(SourceError::Remote(reference.to_string()));
        }
        Ok(Self::Path(PathBuf::from(reference)))
    }

    /// Load the document bytes
    pub fn resolve(&self) -> Result<Arc<[u8]>, SourceError> {
        let bytes: Arc<[u8]> = match self {
            Self::Bytes(bytes) => Arc::clone(bytes),
            Self::Path(path) => read_file(path)?.into(),
            Self::DataUrl(url) => decode_data_url(url)?.into(),
        };
        if bytes.is_empty() {
            return Err(SourceError::Empty);
        }
        Ok(bytes)
    }

    /// Short description for logs; never includes data URL payloads
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
            Self::Path(path) => path.display().to_string(),
            Self::DataUrl(url) => {
                let header = url.split(',').next().unwrap_or_default();
                format!("<{header},... {} chars>", url.len())
            }
        }
    }
}

impl fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DocumentSource")
            .field(&self.describe())
            .finish()
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, SourceError> {
    std::fs::read(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode the payload of a base64 `data:` URL
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, SourceError> {
    let rest = url
        .strip_prefix(DATA_URL_PREFIX)
        .ok_or_else(|| SourceError::InvalidDataUrl("missing data: prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| SourceError::InvalidDataUrl("missing ',' separator".to_string()))?;
    if !header.ends_with(BASE64_MARKER) {
        return Err(SourceError::InvalidDataUrl(format!(
            "unsupported encoding in '{header}'"
        )));
    }

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}
