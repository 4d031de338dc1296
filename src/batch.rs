//! Batch transfer of processed images to the photo album
//!
//! Every item settles on its own: `download_all` and `save_all` fan out one
//! future per input, join them in input order and return one `Result` per
//! item. A failing item never aborts its siblings.

use crate::error::{RemoveBgError, Result};
use crate::permission::PermissionGate;
use crate::platform::{FileTransfer, PhotoAlbum};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;

/// Which half of the transfer an item failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    Download,
    Save,
}

impl std::fmt::Display for TransferStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Download => f.write_str("download"),
            Self::Save => f.write_str("save"),
        }
    }
}

/// An item that made it into the album
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    /// URL or local path the item started from
    pub source: String,
    /// Local file that was saved
    pub local_path: PathBuf,
    /// Location reported by the album
    pub album_path: PathBuf,
}

/// An item that did not
#[derive(Debug)]
pub struct TransferFailure {
    pub source: String,
    pub stage: TransferStage,
    pub error: RemoveBgError,
}

/// Aggregate outcome of a batch transfer
#[derive(Debug, Default)]
pub struct TransferReport {
    /// Number of items the batch started with
    pub requested: usize,
    /// Number of successful downloads (equals `requested` for local saves)
    pub downloaded: usize,
    /// Whether the album permission gate allowed saving
    pub permission_granted: bool,
    pub saved: Vec<SavedImage>,
    pub failures: Vec<TransferFailure>,
}

impl TransferReport {
    /// At least one image reached the album
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.saved.is_empty()
    }

    /// Number of album saves that were attempted
    #[must_use]
    pub fn save_attempts(&self) -> usize {
        self.saved.len() + self.failures_at(TransferStage::Save).count()
    }

    pub fn failures_at(&self, stage: TransferStage) -> impl Iterator<Item = &TransferFailure> {
        self.failures.iter().filter(move |f| f.stage == stage)
    }
}

/// Downloads remote images and saves them to the album
#[derive(Clone)]
pub struct BatchTransfer {
    transfer: Arc<dyn FileTransfer>,
    album: Arc<dyn PhotoAlbum>,
    gate: PermissionGate,
}

impl std::fmt::Debug for BatchTransfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchTransfer")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl BatchTransfer {
    #[must_use]
    pub fn new(
        transfer: Arc<dyn FileTransfer>,
        album: Arc<dyn PhotoAlbum>,
        gate: PermissionGate,
    ) -> Self {
        Self {
            transfer,
            album,
            gate,
        }
    }

    /// Download every URL concurrently; one outcome per URL, in input order
    pub async fn download_all<S: AsRef<str>>(&self, urls: &[S]) -> Vec<Result<PathBuf>> {
        let span = tracing::info_span!("download_all", count = urls.len());
        join_all(urls.iter().map(|url| {
            let url = url.as_ref();
            async move {
                let outcome = self.transfer.download(url).await;
                match &outcome {
                    Ok(path) => tracing::debug!(url, path = %path.display(), "Downloaded"),
                    Err(e) => tracing::warn!(url, error = %e, "Download failed"),
                }
                outcome
            }
        }))
        .instrument(span)
        .await
    }

    /// Save every local file concurrently; one outcome per path, in input order.
    ///
    /// Does not consult the permission gate; see [`Self::save_to_album`].
    pub async fn save_all<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<Result<PathBuf>> {
        let span = tracing::info_span!("save_all", count = paths.len());
        join_all(paths.iter().map(|path| {
            let path = path.as_ref();
            async move {
                let outcome = self.album.save_image(path).await;
                match &outcome {
                    Ok(saved) => tracing::debug!(
                        path = %path.display(),
                        album_path = %saved.display(),
                        "Saved to album"
                    ),
                    Err(e) => tracing::warn!(path = %path.display(), error = %e, "Save failed"),
                }
                outcome
            }
        }))
        .instrument(span)
        .await
    }

    /// Download the URLs, then save whatever arrived.
    ///
    /// Rejected downloads are recorded and skipped. The permission gate is
    /// queried once before saving. Only a failing permission query makes the
    /// whole call fail.
    pub async fn download_then_save<S: AsRef<str>>(&self, urls: &[S]) -> Result<TransferReport> {
        let mut report = TransferReport {
            requested: urls.len(),
            ..TransferReport::default()
        };

        let mut pending = Vec::with_capacity(urls.len());
        for (url, outcome) in urls.iter().zip(self.download_all(urls).await) {
            let url = url.as_ref().to_string();
            match outcome {
                Ok(path) => pending.push((url, path)),
                Err(error) => report.failures.push(TransferFailure {
                    source: url,
                    stage: TransferStage::Download,
                    error,
                }),
            }
        }
        report.downloaded = pending.len();

        self.save_pending(pending, &mut report).await?;
        Self::log_report(&report);
        Ok(report)
    }

    /// Gate, then save local images that are already on disk
    pub async fn save_to_album<P: AsRef<Path>>(&self, paths: &[P]) -> Result<TransferReport> {
        let pending: Vec<(String, PathBuf)> = paths
            .iter()
            .map(|p| {
                let path = p.as_ref().to_path_buf();
                (path.display().to_string(), path)
            })
            .collect();
        let mut report = TransferReport {
            requested: pending.len(),
            downloaded: pending.len(),
            ..TransferReport::default()
        };

        self.save_pending(pending, &mut report).await?;
        Self::log_report(&report);
        Ok(report)
    }

    async fn save_pending(
        &self,
        pending: Vec<(String, PathBuf)>,
        report: &mut TransferReport,
    ) -> Result<()> {
        if pending.is_empty() {
            return Ok(());
        }

        report.permission_granted = self.gate.ensure_album_access().await?;
        if !report.permission_granted {
            tracing::info!(
                pending = pending.len(),
                "Album access not granted, nothing saved"
            );
            return Ok(());
        }

        let paths: Vec<&PathBuf> = pending.iter().map(|(_, path)| path).collect();
        let outcomes = self.save_all(&paths).await;
        for ((source, local_path), outcome) in pending.into_iter().zip(outcomes) {
            match outcome {
                Ok(album_path) => report.saved.push(SavedImage {
                    source,
                    local_path,
                    album_path,
                }),
                Err(error) => report.failures.push(TransferFailure {
                    source,
                    stage: TransferStage::Save,
                    error,
                }),
            }
        }
        Ok(())
    }

    fn log_report(report: &TransferReport) {
        for failure in &report.failures {
            tracing::warn!(
                source = %failure.source,
                stage = %failure.stage,
                error = %failure.error,
                "Item not saved"
            );
        }
        tracing::info!(
            requested = report.requested,
            downloaded = report.downloaded,
            saved = report.saved.len(),
            failed = report.failures.len(),
            "Batch transfer finished"
        );
    }
}
