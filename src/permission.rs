//! Photo-album permission gate
//!
//! The setting is read fresh on every call because the user may change it
//! outside the application between two saves.

use crate::error::Result;
use crate::platform::{PermissionProvider, PermissionScope};
use std::sync::Arc;

/// State of a single permission as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    /// Never requested
    Unknown,
    Granted,
    Denied,
}

impl From<Option<bool>> for PermissionState {
    fn from(setting: Option<bool>) -> Self {
        match setting {
            None => Self::Unknown,
            Some(true) => Self::Granted,
            Some(false) => Self::Denied,
        }
    }
}

/// Checks, and if needed requests, album write access before a save
#[derive(Clone)]
pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
    scope: PermissionScope,
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl PermissionGate {
    /// Gate for [`PermissionScope::WritePhotosAlbum`]
    #[must_use]
    pub fn new(provider: Arc<dyn PermissionProvider>) -> Self {
        Self::for_scope(provider, PermissionScope::WritePhotosAlbum)
    }

    #[must_use]
    pub fn for_scope(provider: Arc<dyn PermissionProvider>, scope: PermissionScope) -> Self {
        Self { provider, scope }
    }

    /// Current state, without prompting
    pub async fn state(&self) -> Result<PermissionState> {
        Ok(self.provider.setting(self.scope).await?.into())
    }

    /// Resolve to `true` when saving is allowed.
    ///
    /// - Unknown: request once; a refusal or a failed request resolves `false` silently.
    /// - Denied: show the settings guide once and resolve `false` without re-requesting.
    /// - Granted: `true` immediately.
    pub async fn ensure_album_access(&self) -> Result<bool> {
        match self.state().await? {
            PermissionState::Granted => Ok(true),
            PermissionState::Unknown => {
                match self.provider.authorize(self.scope).await {
                    Ok(granted) => {
                        tracing::info!(scope = %self.scope, granted, "Permission requested");
                        Ok(granted)
                    },
                    Err(e) => {
                        tracing::warn!(scope = %self.scope, error = %e, "Permission request failed, treating as refused");
                        Ok(false)
                    },
                }
            },
            PermissionState::Denied => {
                tracing::info!(scope = %self.scope, "Permission previously denied, showing guide");
                if let Err(e) = self.provider.show_guide(self.scope).await {
                    tracing::warn!(scope = %self.scope, error = %e, "Failed to show permission guide");
                }
                Ok(false)
            },
        }
    }
}
