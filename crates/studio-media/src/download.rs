//! Streaming download of remote media into the work directory.

use std::path::Path;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Download `url` to `path`, returning the number of bytes written.
///
/// The body is streamed to disk so large renders never sit in memory.
pub async fn download_to(client: &reqwest::Client, url: &str, path: &Path) -> MediaResult<u64> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| MediaError::fetch(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(MediaError::fetch(url, format!("HTTP {}", status.as_u16())));
    }

    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| MediaError::fetch(url, e))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    if written == 0 {
        return Err(MediaError::fetch(url, "empty body"));
    }

    debug!("Downloaded {} bytes from {} to {}", written, url, path.display());
    Ok(written)
}

/// File extension of the last path segment of `url`, or `default`.
pub fn extension_from_url<'a>(url: &'a str, default: &'a str) -> &'a str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext
        }
        _ => default,
    }
}
