//! Failure kinds for the download step.

use thiserror::Error;

/// Why a download produced no local file.
///
/// Every variant carries the URL that was requested.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DownloadError {
    /// HTTP 404
    #[error("file not found (HTTP 404): {url}")]
    NotFound { url: String },

    /// HTTP 403
    #[error("access denied (HTTP 403): {url}")]
    AccessDenied { url: String },

    /// Any other non-success status or transport failure
    #[error("failed to download {url}: {cause}")]
    DownloadFailed { url: String, cause: String },
}

impl DownloadError {
    pub fn url(&self) -> &str {
        match self {
            DownloadError::NotFound { url }
            | DownloadError::AccessDenied { url }
            | DownloadError::DownloadFailed { url, .. } => url,
        }
    }

    pub(crate) fn failed(url: &str, cause: impl ToString) -> Self {
        DownloadError::DownloadFailed {
            url: url.to_string(),
            cause: cause.to_string(),
        }
    }
}
