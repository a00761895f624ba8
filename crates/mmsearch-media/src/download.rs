//! Streaming HTTP download to a local file.

use std::path::Path;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Download a URL to a local file, streaming chunk by chunk.
pub async fn download_to_file(
    client: &reqwest::Client,
    url: &str,
    path: impl AsRef<Path>,
) -> MediaResult<u64> {
    let path = path.as_ref();
    debug!("Downloading {} to {}", url, path.display());

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| MediaError::download_failed(format!("{url}: {e}")))?;

    if !response.status().is_success() {
        return Err(MediaError::download_failed(format!(
            "{url}: HTTP {}",
            response.status()
        )));
    }

    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| MediaError::download_failed(format!("{url}: {e}")))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;

    if written == 0 {
        return Err(MediaError::download_failed(format!("{url}: empty body")));
    }

    debug!("Downloaded {} bytes from {}", written, url);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_unreachable_url_is_download_error() {
        let dir = TempDir::new().unwrap();
        let client = reqwest::Client::new();

        // Port 1 is never listening locally; connect fails without network
        let result =
            download_to_file(&client, "http://127.0.0.1:1/video.mp4", dir.path().join("v")).await;

        assert!(matches!(result, Err(MediaError::DownloadFailed { .. })));
        assert!(!dir.path().join("v").exists());
    }
}
