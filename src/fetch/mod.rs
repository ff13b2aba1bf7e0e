//! Dataset sources: local files, stdin, or HTTP(S) URLs.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use std::io::Read;
use tracing::debug;

use crate::error::EtlError;

#[tracing::instrument(skip(client))]
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>, EtlError> {
    let bytes = client.download(url).await?;
    debug!(bytes = bytes.len(), "Dataset downloaded");
    Ok(bytes)
}

/// True when `source` names a remote dataset.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Reads the whole dataset named by `source`: a URL, `-` for stdin, or a path.
#[tracing::instrument(skip(client))]
pub async fn read_source<C: HttpClient>(client: &C, source: &str) -> Result<Vec<u8>, EtlError> {
    let bytes = if is_remote(source) {
        fetch_bytes(client, source).await?
    } else if source == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        std::fs::read(source)?
    };
    debug!(bytes = bytes.len(), "Source read");
    Ok(bytes)
}
