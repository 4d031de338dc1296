//! Conversion of CLI arguments into library configuration

use crate::cli::main_impl::{Cli, RemoveArgs};
use crate::{
    config::{ClientConfig, ResponseEncoding},
    params::RemoveBackgroundOptions,
    platform::{ConsentStore, DirectoryAlbum, PromptMode},
};
use anyhow::{Context, Result};

/// Convert CLI arguments to library configuration
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the client configuration from global arguments
    ///
    /// clap already folded the `REMOVEBG_*` environment variables into the
    /// arguments, so no second environment lookup happens here.
    pub(crate) fn client_config(cli: &Cli) -> Result<ClientConfig> {
        let api_key = cli
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .context("An API key is required: pass --api-key or set REMOVEBG_API_KEY")?;

        let mut builder = ClientConfig::builder()
            .api_key(api_key)
            .response_encoding(ResponseEncoding::Binary);
        if let Some(base_url) = &cli.base_url {
            builder = builder.base_url(base_url.clone());
        }
        if let Some(timeout_ms) = cli.timeout_ms {
            builder = builder.timeout_ms(timeout_ms);
        }
        builder.build().context("Invalid client configuration")
    }

    /// Rendering options of the `remove` subcommand
    pub(crate) fn removal_options(args: &RemoveArgs) -> RemoveBackgroundOptions {
        RemoveBackgroundOptions {
            size: args.size,
            format: args.format,
            foreground_type: args.foreground_type,
            type_level: args.type_level,
            channels: args.channels,
            bg_color: args.bg_color.clone(),
            bg_image_url: args.bg_image_url.clone(),
            crop: args.crop.then_some(true),
            crop_margin: args.crop_margin.clone(),
            scale: args.scale.clone(),
            position: args.position.clone(),
            roi: args.roi.clone(),
            semitransparency: args.semitransparency,
            shadow_type: args.shadow_type,
            shadow_opacity: args.shadow_opacity,
            add_shadow: None,
        }
    }

    /// Album location: `--album-dir` or the platform default
    pub(crate) fn album(cli: &Cli) -> Result<DirectoryAlbum> {
        match &cli.album_dir {
            Some(dir) => Ok(DirectoryAlbum::new(dir)),
            None => DirectoryAlbum::default_location().context("Failed to locate the photo album"),
        }
    }

    /// Permission store honouring `--yes`
    pub(crate) fn consent_store(cli: &Cli) -> Result<ConsentStore> {
        let store = match &cli.consent_file {
            Some(path) => ConsentStore::new(path),
            None => ConsentStore::default_location()
                .context("Failed to locate the permission store")?,
        };
        let mode = if cli.yes {
            PromptMode::AutoApprove
        } else {
            PromptMode::Interactive
        };
        Ok(store.with_prompt_mode(mode))
    }
}
