//! Platform collaborators
//!
//! The orchestrator and the permission gate only see these traits. The
//! desktop implementations below store downloads in a directory, treat a
//! picture folder as the photo album and persist permission decisions in a
//! small JSON file.

use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod album;
pub mod consent;
pub mod download;

pub use album::DirectoryAlbum;
pub use consent::{ConsentStore, PromptMode};
pub use download::HttpFileTransfer;

/// Device permissions the crate asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionScope {
    /// Writing images to the photo album
    WritePhotosAlbum,
}

impl PermissionScope {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WritePhotosAlbum => "scope.writePhotosAlbum",
        }
    }
}

impl std::fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Downloads a remote file into local storage
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Download `url` and return the local path it was written to
    async fn download(&self, url: &str) -> Result<PathBuf>;
}

/// Persists local images into the photo album
#[async_trait]
pub trait PhotoAlbum: Send + Sync {
    /// Save the image at `path`, returning where the album stored it
    async fn save_image(&self, path: &Path) -> Result<PathBuf>;
}

/// OS-level permission settings and dialogs
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Current setting: `None` if never asked, otherwise the recorded decision
    async fn setting(&self, scope: PermissionScope) -> Result<Option<bool>>;

    /// Ask the user for the permission. `Ok(false)` means the user refused.
    async fn authorize(&self, scope: PermissionScope) -> Result<bool>;

    /// Point the user at the settings where a refused permission can be re-enabled
    async fn show_guide(&self, scope: PermissionScope) -> Result<()>;
}
