//! Document retrieval
//!
//! [`DocumentFetcher`] is the seam between the job pipeline and the network.
//! [`HttpFetcher`] streams the response body into a temp file next to the
//! destination and persists it over `dest` only once the whole body is on
//! disk. The temp file deletes itself when dropped, so a failed or cancelled
//! download (including one cut off by the pipeline's timeout) leaves nothing
//! behind and a previously cached document stays intact.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::errors::{JobError, JobResult, ServiceResult};
use crate::utils::UrlUtils;

/// Prefix of in-flight downloads; never matches the cache's managed extension
pub const STAGING_PREFIX: &str = ".download-";

#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch `url` into `dest`, replacing any existing file. Returns bytes written.
    async fn fetch(&self, url: &str, dest: &Path) -> JobResult<u64>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Client with a connect timeout only; the overall download bound is
    /// applied by the job pipeline.
    pub fn new(connect_timeout: Duration) -> ServiceResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("silent-print/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn download(&self, url: &str, log_url: &str, dest: &Path) -> JobResult<(NamedTempFile, u64)> {
        let parsed =
            UrlUtils::parse_document_url(url).map_err(|e| JobError::retrieval(log_url, e))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| JobError::retrieval(log_url, UrlUtils::obfuscate_credentials(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JobError::retrieval(
                log_url,
                format!(
                    "HTTP {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            ));
        }

        let staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(".tmp")
            .tempfile_in(staging_dir(dest))
            .map_err(|e| JobError::retrieval(log_url, format!("cannot create file: {e}")))?;
        let handle = staged
            .reopen()
            .map_err(|e| JobError::retrieval(log_url, format!("cannot create file: {e}")))?;
        let mut file = tokio::fs::File::from_std(handle);

        let mut written: u64 = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk
                .map_err(|e| JobError::retrieval(log_url, format!("body read failed: {e}")))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| JobError::retrieval(log_url, format!("write failed: {e}")))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| JobError::retrieval(log_url, format!("write failed: {e}")))?;
        file.sync_all()
            .await
            .map_err(|e| JobError::retrieval(log_url, format!("write failed: {e}")))?;

        debug!("Downloaded {} bytes from {}", written, log_url);
        Ok((staged, written))
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> JobResult<u64> {
        let log_url = UrlUtils::obfuscate_credentials(url);
        let (staged, written) = self.download(url, &log_url, dest).await?;

        staged.persist(dest).map_err(|e| {
            JobError::retrieval(
                &log_url,
                format!("cannot move download into place: {}", e.error),
            )
        })?;
        Ok(written)
    }
}

fn staging_dir(dest: &Path) -> &Path {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
