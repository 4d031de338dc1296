#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_name_repetitions)]

//! # removebg-saver
//!
//! Typed client for the [remove.bg](https://www.remove.bg) background removal
//! API, plus the plumbing to get processed images into a photo album.
//!
//! ## Features
//!
//! - **API client**: background removal (file, URL or base64 input) and
//!   account balance, with every documented HTTP status mapped to a typed
//!   [`RemoveBgError`] variant
//! - **Rate limits**: `X-RateLimit-*` and `Retry-After` surfaced on results and errors
//! - **Batch transfer**: concurrent download-then-save where every item
//!   settles on its own and order is preserved
//! - **Permission gate**: album write access is checked fresh before each save
//! - **CLI**: `removebg-saver` binary (enable with the `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use removebg_saver::{ClientConfig, ImageSize, RemoveBackgroundParams, RemoveBgClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = RemoveBgClient::new(ClientConfig::from_env()?)?;
//!
//! let params = RemoveBackgroundParams::builder()
//!     .image_url("https://example.com/cat.jpg")
//!     .size(ImageSize::Regular)
//!     .build()?;
//! let result = client.remove_background_to_file(&params, "cat_no_bg.png").await?;
//! println!("{} credit(s) charged", result.credits_charged);
//!
//! let account = client.get_account().await?;
//! println!("{} credits left", account.credits.total);
//! # Ok(())
//! # }
//! ```
//!
//! ## Saving to the album
//!
//! ```rust,no_run
//! use removebg_saver::{
//!     BatchTransfer, ConsentStore, DirectoryAlbum, HttpFileTransfer, PermissionGate,
//! };
//! use std::sync::Arc;
//!
//! # async fn example(urls: Vec<String>) -> anyhow::Result<()> {
//! let batch = BatchTransfer::new(
//!     Arc::new(HttpFileTransfer::in_temp_dir()?),
//!     Arc::new(DirectoryAlbum::default_location()?),
//!     PermissionGate::new(Arc::new(ConsentStore::default_location()?)),
//! );
//! let report = batch.download_then_save(&urls).await?;
//! println!("{} of {} saved", report.saved.len(), report.requested);
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface, progress bars and the tracing subscriber setup
//! - `tracing-json`: JSON log output for the CLI
//!
//! Library-only usage:
//!
//! ```toml
//! [dependencies]
//! removebg-saver = { version = "0.1", default-features = false }
//! ```

pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod params;
pub mod permission;
pub mod platform;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use batch::{BatchTransfer, SavedImage, TransferFailure, TransferReport, TransferStage};
pub use client::{check_status, RemoveBgClient};
pub use config::{ClientConfig, ClientConfigBuilder, ResponseEncoding, DEFAULT_BASE_URL};
pub use error::{RemoveBgError, Result};
pub use params::{
    Channels, ForegroundType, ImageFormat, ImageSize, ImageSource, RemoveBackgroundOptions,
    RemoveBackgroundParams, RemoveBackgroundParamsBuilder, ShadowType, TypeLevel,
};
pub use permission::{PermissionGate, PermissionState};
pub use platform::{
    ConsentStore, DirectoryAlbum, FileTransfer, HttpFileTransfer, PermissionProvider,
    PermissionScope, PhotoAlbum, PromptMode,
};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};
pub use types::{
    AccountInfo, ApiErrorEntry, ApiInfo, Credits, DetectedType, ErrorCode, ErrorResponse,
    ForegroundBox, ImageData, RateLimit, RemoveBackgroundResult,
};

#[cfg(feature = "cli")]
pub use tracing_config::{events, init_cli_tracing, spans, TracingConfig, TracingFormat};
