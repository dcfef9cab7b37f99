//! Download of the source CSV to a local file.

mod basic;
mod client;
mod error;

pub use basic::{BasicClient, DEFAULT_TIMEOUT};
pub use client::HttpClient;
pub use error::DownloadError;

use std::path::{Path, PathBuf};

use reqwest::{StatusCode, Url};
use tracing::{debug, error, info};

pub const DEFAULT_DOWNLOAD_FILE: &str = "latest.csv";

/// Maps a response status onto the download error kinds.
pub fn classify_status(url: &str, status: StatusCode) -> Result<(), DownloadError> {
    match status {
        StatusCode::NOT_FOUND => Err(DownloadError::NotFound {
            url: url.to_string(),
        }),
        StatusCode::FORBIDDEN => Err(DownloadError::AccessDenied {
            url: url.to_string(),
        }),
        s if s.is_success() => Ok(()),
        s => Err(DownloadError::failed(url, format!("HTTP status {s}"))),
    }
}

/// GETs `url` and writes the response body as text to `dest`.
///
/// # Errors
///
/// [`DownloadError::NotFound`] on 404, [`DownloadError::AccessDenied`] on 403,
/// and [`DownloadError::DownloadFailed`] for everything else that goes wrong,
/// including a URL that does not parse and a failed write of `dest`. Nothing
/// is written unless the request succeeded.
#[tracing::instrument(skip(client, dest))]
pub async fn download_csv<C: HttpClient>(
    client: &C,
    url: &str,
    dest: impl AsRef<Path>,
) -> Result<PathBuf, DownloadError> {
    let dest = dest.as_ref();
    let parsed: Url = url.parse().map_err(|e| DownloadError::failed(url, e))?;

    let req = reqwest::Request::new(reqwest::Method::GET, parsed);
    let resp = client
        .execute(req)
        .await
        .map_err(|e| DownloadError::failed(url, e))?;

    debug!(status = %resp.status(), "Response received");
    classify_status(url, resp.status())?;

    let body = resp
        .text()
        .await
        .map_err(|e| DownloadError::failed(url, e))?;

    tokio::fs::write(dest, body.as_bytes())
        .await
        .map_err(|e| DownloadError::failed(url, format!("writing {}: {e}", dest.display())))?;

    info!(path = %dest.display(), bytes = body.len(), "Saved file");
    Ok(dest.to_path_buf())
}

/// Like [`download_csv`], but logs the failure and returns `None` instead.
///
/// Callers must treat `None` as "no input available" and stop.
pub async fn fetch<C: HttpClient>(
    client: &C,
    url: &str,
    dest: impl AsRef<Path>,
) -> Option<PathBuf> {
    match download_csv(client, url, dest).await {
        Ok(path) => Some(path),
        Err(e) => {
            error!(url = e.url(), error = %e, "Download failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_client() -> BasicClient {
        BasicClient::from(reqwest::Client::builder().no_proxy().build().unwrap())
    }

    #[test]
    fn test_classify_not_found() {
        let result = classify_status("http://h/a.csv", StatusCode::NOT_FOUND);
        assert_eq!(
            result,
            Err(DownloadError::NotFound {
                url: "http://h/a.csv".into()
            })
        );
    }

    #[test]
    fn test_classify_forbidden() {
        let result = classify_status("http://h/a.csv", StatusCode::FORBIDDEN);
        assert!(matches!(result, Err(DownloadError::AccessDenied { .. })));
    }

    #[test]
    fn test_classify_success_codes() {
        assert!(classify_status("u", StatusCode::OK).is_ok());
        assert!(classify_status("u", StatusCode::NO_CONTENT).is_ok());
    }

    #[test]
    fn test_classify_other_failures() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::UNAUTHORIZED,
            StatusCode::BAD_GATEWAY,
            StatusCode::MOVED_PERMANENTLY,
        ] {
            match classify_status("u", status) {
                Err(DownloadError::DownloadFailed { url, cause }) => {
                    assert_eq!(url, "u");
                    assert!(cause.contains(status.as_str()));
                }
                other => panic!("unexpected result for {status}: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_invalid_url_fails_without_writing() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("latest.csv");

        let err = download_csv(&test_client(), "not a url", &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::DownloadFailed { .. }));
        assert_eq!(err.url(), "not a url");
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_connection_refused_yields_none() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("latest.csv");

        let url = format!("http://127.0.0.1:{port}/sample.csv");
        let result = fetch(&test_client(), &url, &dest).await;

        assert!(result.is_none());
        assert!(!dest.exists());
    }
}
