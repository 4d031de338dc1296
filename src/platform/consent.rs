//! Permission decisions persisted in a JSON file
//!
//! The file plays the role of the system settings page: a scope missing from
//! it has never been requested, `true`/`false` record the user's answer.

use crate::error::{RemoveBgError, Result};
use crate::platform::{PermissionProvider, PermissionScope};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

/// Application directory under the user's config dir
pub const APP_DIR_NAME: &str = "removebg-saver";

/// File name of the permission store
pub const CONSENT_FILE_NAME: &str = "permissions.json";

/// How a never-answered permission request is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptMode {
    /// Ask on the terminal; refuse when stdin is not a terminal
    #[default]
    Interactive,
    /// Grant without asking (`--yes`)
    AutoApprove,
    /// Refuse without asking
    AutoDeny,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConsentFile {
    #[serde(default)]
    scopes: BTreeMap<String, bool>,
}

/// File-backed [`PermissionProvider`]
#[derive(Debug, Clone)]
pub struct ConsentStore {
    path: PathBuf,
    mode: PromptMode,
}

impl ConsentStore {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            mode: PromptMode::default(),
        }
    }

    /// Store in `<config dir>/removebg-saver/permissions.json`
    ///
    /// # Errors
    /// - The platform has no user config directory
    pub fn default_location() -> Result<Self> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            RemoveBgError::platform("Could not determine the user's config directory")
        })?;
        Ok(Self::new(
            config_dir.join(APP_DIR_NAME).join(CONSENT_FILE_NAME),
        ))
    }

    #[must_use]
    pub fn with_prompt_mode(mut self, mode: PromptMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a grant, as if toggled on in the settings
    pub async fn grant(&self, scope: PermissionScope) -> Result<()> {
        self.record(scope, Some(true)).await
    }

    /// Record a refusal
    pub async fn revoke(&self, scope: PermissionScope) -> Result<()> {
        self.record(scope, Some(false)).await
    }

    /// Forget the decision so the next save asks again
    pub async fn reset(&self, scope: PermissionScope) -> Result<()> {
        self.record(scope, None).await
    }

    async fn load(&self) -> Result<ConsentFile> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| {
                RemoveBgError::platform(format!(
                    "Corrupt permission store {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConsentFile::default()),
            Err(e) => Err(RemoveBgError::file_io_error(
                "read permission store",
                &self.path,
                &e,
            )),
        }
    }

    async fn record(&self, scope: PermissionScope, decision: Option<bool>) -> Result<()> {
        let mut file = self.load().await?;
        match decision {
            Some(granted) => {
                file.scopes.insert(scope.as_str().to_string(), granted);
            },
            None => {
                file.scopes.remove(scope.as_str());
            },
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RemoveBgError::file_io_error("create config directory", parent, &e))?;
        }
        let raw = serde_json::to_vec_pretty(&file).map_err(|e| {
            RemoveBgError::platform(format!("Failed to encode permission store: {}", e))
        })?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| RemoveBgError::file_io_error("write permission store", &self.path, &e))?;

        tracing::debug!(scope = %scope, ?decision, path = %self.path.display(), "Permission recorded");
        Ok(())
    }

    async fn ask(scope: PermissionScope) -> Result<bool> {
        tokio::task::spawn_blocking(move || -> std::io::Result<bool> {
            let stdin = std::io::stdin();
            if !stdin.is_terminal() {
                return Ok(false);
            }
            let mut stderr = std::io::stderr();
            write!(
                stderr,
                "Allow removebg-saver to save images to your photo album ({})? [y/N] ",
                scope
            )?;
            stderr.flush()?;

            let mut answer = String::new();
            stdin.lock().read_line(&mut answer)?;
            Ok(matches!(
                answer.trim().to_ascii_lowercase().as_str(),
                "y" | "yes"
            ))
        })
        .await
        .map_err(|e| RemoveBgError::platform(format!("Permission prompt failed: {}", e)))?
        .map_err(RemoveBgError::Io)
    }
}

#[async_trait]
impl PermissionProvider for ConsentStore {
    async fn setting(&self, scope: PermissionScope) -> Result<Option<bool>> {
        Ok(self.load().await?.scopes.get(scope.as_str()).copied())
    }

    async fn authorize(&self, scope: PermissionScope) -> Result<bool> {
        let granted = match self.mode {
            PromptMode::AutoApprove => true,
            PromptMode::AutoDeny => false,
            PromptMode::Interactive => Self::ask(scope).await?,
        };
        // the answer stands for this run even if it cannot be remembered
        if let Err(e) = self.record(scope, Some(granted)).await {
            tracing::warn!(scope = %scope, granted, error = %e, "Failed to persist permission decision");
        }
        Ok(granted)
    }

    async fn show_guide(&self, scope: PermissionScope) -> Result<()> {
        tracing::info!(scope = %scope, path = %self.path.display(), "Permission denied earlier");
        eprintln!(
            "Saving to the photo album was declined earlier ({}).\n\
             Re-enable it with `removebg-saver permissions --grant`,\n\
             or forget the decision with `removebg-saver permissions --reset`.\n\
             Decisions are stored in {}",
            scope,
            self.path.display()
        );
        Ok(())
    }
}
