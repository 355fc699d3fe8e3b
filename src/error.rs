use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not fetch table of contents {url}: {reason}")]
    TocFetch { url: String, reason: String },

    #[error("table of contents {url} is malformed: {reason}")]
    TocFormat { url: String, reason: String },

    #[error("page metadata lookup failed for {url}: {reason}")]
    PageMetadataLookup { url: String, reason: String },

    #[error("could not fetch archive page {url}: {reason}")]
    CatalogFetch { url: String, reason: String },

    #[error("This website is currently not available in your region.")]
    RegionUnavailable,

    #[error("unknown {kind} code: {code}")]
    UnknownCode { kind: &'static str, code: String },

    #[error("invalid edition selection: {0}")]
    InvalidSelector(String),

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("blocking task failed: {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),

    #[error("download cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}
