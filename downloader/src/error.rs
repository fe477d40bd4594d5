/// Errors surfaced by download operations.
use fetchkeep_shared::errors::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Server answered {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to download {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        last: reqwest::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DownloadError {
    pub(crate) fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        DownloadError::InvalidUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether another attempt of the same request could succeed.
    ///
    /// Only transport-level failures qualify. A request that could not even
    /// be built, status codes, disk and store failures are terminal.
    pub fn is_retriable(&self) -> bool {
        match self {
            DownloadError::Transport(e) => !e.is_builder(),
            _ => false,
        }
    }
}

/// Result type alias for downloader operations.
pub type DownloadResult<T> = Result<T, DownloadError>;
