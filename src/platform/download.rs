//! Streaming HTTP download of processed images into a local directory

use crate::error::{RemoveBgError, Result};
use crate::platform::FileTransfer;
use async_trait::async_trait;
use futures_util::stream::TryStreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

/// Fallback file name when the URL has no usable last segment
const DEFAULT_FILE_NAME: &str = "image";

/// Downloads files over HTTP(S) into `download_dir`
///
/// Every download gets a fresh, collision-free file name so concurrent
/// downloads of the same URL never overwrite each other.
#[derive(Debug, Clone)]
pub struct HttpFileTransfer {
    client: Client,
    download_dir: PathBuf,
}

impl HttpFileTransfer {
    /// Create a transfer writing into `download_dir`
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new<P: Into<PathBuf>>(download_dir: P) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| RemoveBgError::transport("Failed to create HTTP client", e))?;
        Ok(Self::with_client(client, download_dir))
    }

    /// Create a transfer writing into the system temp directory
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn in_temp_dir() -> Result<Self> {
        Self::new(std::env::temp_dir().join("removebg-saver"))
    }

    #[must_use]
    pub fn with_client<P: Into<PathBuf>>(client: Client, download_dir: P) -> Self {
        Self {
            client,
            download_dir: download_dir.into(),
        }
    }

    #[must_use]
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Unique local path for `url`
    fn local_path_for(&self, url: &str) -> PathBuf {
        let name = file_name_from_url(url);
        self.download_dir
            .join(format!("{}-{}", uuid::Uuid::new_v4().simple(), name))
    }

    async fn download_to(&self, url: &str, local_path: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RemoveBgError::transport(format!("Failed to download {}", url), e))?;

        if !response.status().is_success() {
            return Err(RemoveBgError::transport(
                format!("HTTP error {} for {}", response.status(), url),
                std::io::Error::new(std::io::ErrorKind::Other, "HTTP error"),
            ));
        }

        let mut file = tokio::fs::File::create(local_path)
            .await
            .map_err(|e| RemoveBgError::file_io_error("create file", local_path, &e))?;

        let mut stream = StreamReader::new(
            response
                .bytes_stream()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
        );

        let written = tokio::io::copy(&mut stream, &mut file)
            .await
            .map_err(|e| RemoveBgError::transport("Failed to read download stream", e))?;

        file.flush()
            .await
            .map_err(|e| RemoveBgError::file_io_error("flush file", local_path, &e))?;

        Ok(written)
    }
}

#[async_trait]
impl FileTransfer for HttpFileTransfer {
    async fn download(&self, url: &str) -> Result<PathBuf> {
        let url = url.trim();
        if url.is_empty() {
            return Err(RemoveBgError::invalid_request("Download URL is empty"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(RemoveBgError::invalid_request(format!(
                "Unsupported download URL: {}. Only http and https are supported.",
                url
            )));
        }

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| {
                RemoveBgError::file_io_error("create download directory", &self.download_dir, &e)
            })?;

        let local_path = self.local_path_for(url);
        log::debug!("Downloading: {} -> {}", url, local_path.display());

        match self.download_to(url, &local_path).await {
            Ok(bytes) => {
                log::debug!("Downloaded {} bytes to {}", bytes, local_path.display());
                Ok(local_path)
            },
            Err(e) => {
                // partial files must not be saved later
                if let Err(cleanup_err) = tokio::fs::remove_file(&local_path).await {
                    if cleanup_err.kind() != std::io::ErrorKind::NotFound {
                        log::warn!("Failed to remove partial download: {}", cleanup_err);
                    }
                }
                Err(e)
            },
        }
    }
}

/// Last path segment of `url`, stripped of query and fragment, safe as a file name
fn file_name_from_url(url: &str) -> String {
    let without_suffix = url
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    let after_scheme = without_suffix
        .split_once("://")
        .map_or(without_suffix, |(_, rest)| rest);
    // a bare host has no file segment
    let segment = after_scheme
        .split_once('/')
        .and_then(|(_, path)| path.rsplit('/').next())
        .unwrap_or_default();

    let cleaned: String = segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}
