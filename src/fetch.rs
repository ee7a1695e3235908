//! Download remote inputs into the working directory.

use crate::category::extension_of;
use crate::error::{AppError, Result};
use crate::workspace::Workspace;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Extension used when the original name carries none.
const FALLBACK_EXTENSION: &str = "tmp";

pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Stream `url` into a fresh temp artifact named after `original_name`'s extension.
    ///
    /// A body that breaks off mid-transfer surfaces as an IO error and the
    /// partial file is left where it is.
    pub async fn fetch(
        &self,
        url: &str,
        original_name: &str,
        workspace: &Workspace,
    ) -> Result<PathBuf> {
        let ext = match extension_of(original_name) {
            ext if ext.is_empty() => FALLBACK_EXTENSION.to_string(),
            ext => ext,
        };
        let file_path = workspace.allocate(&ext).await?;

        info!("Downloading {} to {}", url, file_path.display());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(AppError::FetchFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let mut file = tokio::fs::File::create(&file_path).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(std::io::Error::other)?;
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        info!("Downloaded {} bytes to {}", written, file_path.display());
        Ok(file_path)
    }
}
