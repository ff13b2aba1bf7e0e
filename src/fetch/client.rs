use async_trait::async_trait;
use reqwest::{Method, Request, Response};

use crate::error::EtlError;

/// Transport for remote dataset sources.
///
/// Implementors only supply [`execute`](HttpClient::execute); downloading a
/// dataset is built on top of it.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;

    /// GETs `url` and returns the body. Non-2xx statuses are errors.
    async fn download(&self, url: &str) -> Result<Vec<u8>, EtlError> {
        let parsed = url
            .parse()
            .map_err(|e| EtlError::Config(format!("invalid URL '{url}': {e}")))?;
        let resp = self
            .execute(Request::new(Method::GET, parsed))
            .await?
            .error_for_status()?;
        Ok(resp.bytes().await?.to_vec())
    }
}
