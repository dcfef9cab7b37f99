use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport used by the fetcher to send a single prepared request.
///
/// Status codes are returned untouched; classifying them is the caller's job.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
