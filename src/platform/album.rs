//! Photo album backed by a picture directory

use crate::error::{RemoveBgError, Result};
use crate::platform::PhotoAlbum;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Subdirectory of the user's picture folder used by default
pub const DEFAULT_ALBUM_NAME: &str = "removebg";

/// Upper bound on `name-N.ext` probes before giving up
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Copies images into a directory, never overwriting an existing entry
#[derive(Debug, Clone)]
pub struct DirectoryAlbum {
    root: PathBuf,
}

impl DirectoryAlbum {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Album in `<pictures>/removebg`
    ///
    /// # Errors
    /// - The platform exposes neither a picture nor a home directory
    pub fn default_location() -> Result<Self> {
        let base = dirs::picture_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
            .ok_or_else(|| {
                RemoveBgError::platform("Could not determine the user's picture directory")
            })?;
        Ok(Self::new(base.join(DEFAULT_ALBUM_NAME)))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the first free `name.ext`, `name-1.ext`, `name-2.ext`, ... in the album
    ///
    /// The name is claimed with `create_new`, so concurrent saves of equally
    /// named files each get their own entry.
    async fn reserve_target(&self, file_name: &str) -> Result<(PathBuf, tokio::fs::File)> {
        let as_path = Path::new(file_name);
        let stem = as_path
            .file_stem()
            .map_or_else(|| file_name.to_string(), |s| s.to_string_lossy().into_owned());
        let extension = as_path
            .extension()
            .map(|e| e.to_string_lossy().into_owned());

        for n in 0..=MAX_NAME_ATTEMPTS {
            let name = match (n, &extension) {
                (0, _) => file_name.to_string(),
                (_, Some(ext)) => format!("{}-{}.{}", stem, n, ext),
                (_, None) => format!("{}-{}", stem, n),
            };
            let candidate = self.root.join(name);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(RemoveBgError::file_io_error(
                        "create album entry",
                        &candidate,
                        &e,
                    ))
                },
            }
        }

        Err(RemoveBgError::platform(format!(
            "No free file name for {} in {}",
            file_name,
            self.root.display()
        )))
    }
}

async fn copy_into(source: &Path, target: &mut tokio::fs::File) -> std::io::Result<u64> {
    let mut reader = tokio::fs::File::open(source).await?;
    let written = tokio::io::copy(&mut reader, target).await?;
    target.flush().await?;
    Ok(written)
}

#[async_trait]
impl PhotoAlbum for DirectoryAlbum {
    async fn save_image(&self, path: &Path) -> Result<PathBuf> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| RemoveBgError::file_io_error("read image", path, &e))?;
        if !metadata.is_file() {
            return Err(RemoveBgError::invalid_request(format!(
                "Not a file: {}",
                path.display()
            )));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                RemoveBgError::invalid_request(format!("No file name in {}", path.display()))
            })?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| RemoveBgError::file_io_error("create album directory", &self.root, &e))?;

        let (target, mut file) = self.reserve_target(&file_name).await?;
        if let Err(e) = copy_into(path, &mut file).await {
            drop(file);
            if let Err(cleanup_err) = tokio::fs::remove_file(&target).await {
                log::warn!("Failed to remove incomplete album entry: {}", cleanup_err);
            }
            return Err(RemoveBgError::file_io_error("copy image into album", &target, &e));
        }

        log::debug!("Saved {} to album as {}", path.display(), target.display());
        Ok(target)
    }
}
