//! removebg-saver command-line tool
//!
//! Thin front end over the library: one subcommand per user flow (account
//! balance, background removal, album transfer, permission settings).

use super::config::CliConfigBuilder;
use crate::{
    batch::{BatchTransfer, TransferReport, TransferStage},
    client::RemoveBgClient,
    config::{API_KEY_ENV, BASE_URL_ENV, TIMEOUT_ENV},
    error::RemoveBgError,
    params::{
        Channels, ForegroundType, ImageFormat, ImageSize, RemoveBackgroundParams, ShadowType,
        TypeLevel,
    },
    permission::{PermissionGate, PermissionState},
    platform::{HttpFileTransfer, PermissionScope},
    tracing_config::{events, spans, TracingFormat},
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Remove image backgrounds with remove.bg and save the results to your photo album
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "removebg-saver")]
pub struct Cli {
    /// remove.bg API key
    #[arg(long, global = true, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// API base URL
    #[arg(long, global = true, env = BASE_URL_ENV)]
    pub base_url: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, global = true, env = TIMEOUT_ENV)]
    pub timeout_ms: Option<u64>,

    /// Photo album directory [default: <pictures>/removebg]
    #[arg(long, global = true, value_name = "DIR")]
    pub album_dir: Option<PathBuf>,

    /// Permission store file [default: <config>/removebg-saver/permissions.json]
    #[arg(long, global = true, value_name = "FILE", hide = true)]
    pub consent_file: Option<PathBuf>,

    /// Grant album access without prompting when it has never been requested
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = TracingFormat::Console)]
    pub log_format: TracingFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the account's credit balance
    Account {
        /// Print the account as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove the background of local files or image URLs
    Remove(RemoveArgs),
    /// Download processed images and save them to the album
    Save {
        /// Result URLs to download
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,

        /// Where downloads are kept [default: system temp dir]
        #[arg(long, value_name = "DIR")]
        download_dir: Option<PathBuf>,
    },
    /// Show or change the photo album permission
    Permissions {
        /// Allow saving to the album
        #[arg(long, conflicts_with_all = ["revoke", "reset"])]
        grant: bool,

        /// Deny saving to the album
        #[arg(long, conflicts_with = "reset")]
        revoke: bool,

        /// Forget the decision; the next save asks again
        #[arg(long)]
        reset: bool,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Account { .. } => "account",
            Self::Remove(_) => "remove",
            Self::Save { .. } => "save",
            Self::Permissions { .. } => "permissions",
        }
    }
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Image files or http(s) URLs
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<String>,

    /// Directory for the results
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Also save every result to the photo album
    #[arg(long)]
    pub save_to_album: bool,

    /// Output resolution (auto, preview, small, regular, medium, hd, 4k, 50MP)
    #[arg(long)]
    pub size: Option<ImageSize>,

    /// Output format (auto, png, jpg, webp, zip)
    #[arg(short, long)]
    pub format: Option<ImageFormat>,

    /// Foreground type (auto, person, product, animal, car, transportation, graphic, other)
    #[arg(long = "type")]
    pub foreground_type: Option<ForegroundType>,

    /// Classification level (none, latest, 1, 2)
    #[arg(long)]
    pub type_level: Option<TypeLevel>,

    /// Channels (rgba, alpha)
    #[arg(long)]
    pub channels: Option<Channels>,

    /// Background color, e.g. 81d4fa or green
    #[arg(long)]
    pub bg_color: Option<String>,

    /// Background image URL
    #[arg(long)]
    pub bg_image_url: Option<String>,

    /// Crop off empty regions
    #[arg(long)]
    pub crop: bool,

    /// Margin around the cropped subject, e.g. 10px or 5%
    #[arg(long)]
    pub crop_margin: Option<String>,

    /// Subject scale, e.g. 80%
    #[arg(long)]
    pub scale: Option<String>,

    /// Subject position, e.g. center or "50% 0%"
    #[arg(long)]
    pub position: Option<String>,

    /// Region of interest, "x1 y1 x2 y2"
    #[arg(long)]
    pub roi: Option<String>,

    /// Keep semi-transparent regions
    #[arg(long)]
    pub semitransparency: Option<bool>,

    /// Shadow type (none, drop, natural)
    #[arg(long)]
    pub shadow_type: Option<ShadowType>,

    /// Shadow opacity, 0-100
    #[arg(long)]
    pub shadow_opacity: Option<u8>,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format).context("Failed to initialize tracing")?;

    let span = spans::session(cli.command.name());
    async {
        match &cli.command {
            Command::Account { json } => show_account(&cli, *json).await,
            Command::Remove(args) => remove_backgrounds(&cli, args).await,
            Command::Save {
                urls,
                download_dir,
            } => save_urls(&cli, urls, download_dir.as_deref()).await,
            Command::Permissions {
                grant,
                revoke,
                reset,
            } => manage_permissions(&cli, *grant, *revoke, *reset).await,
        }
    }
    .instrument(span)
    .await
}

fn init_tracing(verbose_count: u8, format: TracingFormat) -> Result<()> {
    crate::tracing_config::init_cli_tracing(verbose_count, format)
        .context("Failed to initialize tracing subscriber")?;
    tracing::debug!(verbosity = verbose_count, "Tracing initialized");
    Ok(())
}

fn client(cli: &Cli) -> Result<RemoveBgClient> {
    let config = CliConfigBuilder::client_config(cli)?;
    RemoveBgClient::new(config).context("Failed to create API client")
}

fn batch_transfer(cli: &Cli, download_dir: Option<&Path>) -> Result<BatchTransfer> {
    let transfer = match download_dir {
        Some(dir) => HttpFileTransfer::new(dir),
        None => HttpFileTransfer::in_temp_dir(),
    }
    .context("Failed to create downloader")?;
    let album = CliConfigBuilder::album(cli)?;
    let consent = CliConfigBuilder::consent_store(cli)?;
    tracing::debug!(
        album = %album.root().display(),
        consent = %consent.path().display(),
        downloads = %transfer.download_dir().display(),
        "Platform collaborators ready"
    );

    Ok(BatchTransfer::new(
        Arc::new(transfer),
        Arc::new(album),
        PermissionGate::new(Arc::new(consent)),
    ))
}

async fn show_account(cli: &Cli, json: bool) -> Result<()> {
    let account = client(cli)?
        .get_account()
        .await
        .context("Failed to fetch account")?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&account).context("Failed to encode account")?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("Credits:       {}", account.credits.total);
    println!("  subscription {}", account.credits.subscription);
    println!("  pay-as-you-go {}", account.credits.payg);
    if let Some(enterprise) = account.enterprise {
        println!("  enterprise   {}", enterprise);
    }
    println!("Free API calls: {}", account.api.free_calls);
    println!("Sizes:          {}", account.api.sizes);
    Ok(())
}

async fn remove_backgrounds(cli: &Cli, args: &RemoveArgs) -> Result<()> {
    let client = client(cli)?;
    let options = CliConfigBuilder::removal_options(args);
    let extension = options.format.map_or("png", |f| f.extension());

    tokio::fs::create_dir_all(&args.output_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                args.output_dir.display()
            )
        })?;

    let progress = (args.inputs.len() > 1).then(|| progress_bar(args.inputs.len() as u64));

    let outputs = plan_output_paths(&args.inputs, &args.output_dir, extension);
    let mut written = Vec::new();
    let mut failed = 0usize;
    for (input, output) in args.inputs.iter().zip(outputs) {
        if let Some(pb) = &progress {
            pb.set_message(format!("Processing {}", input));
        }

        let outcome = async {
            let params = build_params(input)
                .await?
                .with_options(options.clone());
            client.remove_background_to_file(&params, &output).await
        }
        .instrument(spans::remove_input(input))
        .await;

        match outcome {
            Ok(result) => {
                events::rate_limit(&result.rate_limit);
                println!(
                    "{} -> {} ({}x{}, {}, {} credit(s))",
                    input,
                    output.display(),
                    result.result_width,
                    result.result_height,
                    result.detected_type,
                    result.credits_charged
                );
                written.push(output);
            },
            Err(e) => {
                failed += 1;
                report_removal_error(input, &e);
            },
        }

        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_with_message(format!("{} processed, {} failed", written.len(), failed));
    }

    if args.save_to_album && !written.is_empty() {
        let report = batch_transfer(cli, None)?
            .save_to_album(&written)
            .await
            .context("Failed to query album permission")?;
        print_report(&report);
    }

    if written.is_empty() {
        anyhow::bail!("No background could be removed ({} failed)", failed);
    }
    Ok(())
}

async fn build_params(input: &str) -> crate::Result<RemoveBackgroundParams> {
    if is_remote(input) {
        Ok(RemoveBackgroundParams::from_url(input))
    } else {
        RemoveBackgroundParams::from_path(input).await
    }
}

fn report_removal_error(input: &str, error: &RemoveBgError) {
    match error {
        RemoveBgError::RateLimited { .. } => events::warning_with_recommendation(
            &format!("{}: {}", input, error),
            "wait for the rate limit window to reset, then retry",
        ),
        RemoveBgError::InsufficientCredits(_) => events::warning_with_recommendation(
            &format!("{}: {}", input, error),
            "top up the account, see `removebg-saver account`",
        ),
        _ => events::error_with_context(error, input),
    }
}

async fn save_urls(cli: &Cli, urls: &[String], download_dir: Option<&Path>) -> Result<()> {
    let batch = batch_transfer(cli, download_dir)?;

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("Downloading {} image(s)", urls.len()));

    let report = batch
        .download_then_save(urls)
        .instrument(spans::batch_transfer(urls.len()))
        .await;
    spinner.finish_and_clear();

    let report = report.context("Failed to query album permission")?;
    print_report(&report);

    if !report.is_success() {
        anyhow::bail!("No image was saved to the album");
    }
    Ok(())
}

async fn manage_permissions(cli: &Cli, grant: bool, revoke: bool, reset: bool) -> Result<()> {
    let store = CliConfigBuilder::consent_store(cli)?;
    let scope = PermissionScope::WritePhotosAlbum;

    if grant {
        store.grant(scope).await?;
    } else if revoke {
        store.revoke(scope).await?;
    } else if reset {
        store.reset(scope).await?;
    }

    let state = PermissionGate::new(Arc::new(store.clone()))
        .state()
        .await
        .context("Failed to read permission store")?;
    let label = match state {
        PermissionState::Unknown => "not requested yet",
        PermissionState::Granted => "granted",
        PermissionState::Denied => "denied",
    };
    println!("{}: {}", scope, label);
    println!("Stored in {}", store.path().display());
    Ok(())
}

fn print_report(report: &TransferReport) {
    for saved in &report.saved {
        println!("Saved {} -> {}", saved.source, saved.album_path.display());
    }
    for failure in report.failures_at(TransferStage::Download) {
        eprintln!("Download failed: {}: {}", failure.source, failure.error);
    }
    for failure in report.failures_at(TransferStage::Save) {
        eprintln!("Save failed: {}: {}", failure.source, failure.error);
    }
    if report.downloaded > 0 && !report.permission_granted {
        eprintln!("Album access not granted; nothing was saved");
    }
    println!(
        "{} of {} image(s) saved to the album",
        report.saved.len(),
        report.requested
    );
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn is_remote(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// `<output_dir>/<stem>_no_bg.<ext>` for a file path or URL input
fn generate_output_path(input: &str, output_dir: &Path, extension: &str) -> PathBuf {
    let name = if is_remote(input) {
        input
            .split(|c| c == '?' || c == '#')
            .next()
            .and_then(|url| url.rsplit('/').next())
            .unwrap_or_default()
    } else {
        input
    };
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string());

    output_dir.join(format!("{}_no_bg.{}", stem, extension))
}

/// One output path per input; repeated names within a run get a `-N` suffix
fn plan_output_paths(inputs: &[String], output_dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut taken = HashSet::with_capacity(inputs.len());
    inputs
        .iter()
        .map(|input| {
            let base = generate_output_path(input, output_dir, extension);
            let stem = base
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut candidate = base.clone();
            let mut n = 1u32;
            while !taken.insert(candidate.clone()) {
                candidate = base.with_file_name(format!("{}-{}.{}", stem, n, extension));
                n += 1;
            }
            candidate
        })
        .collect()
}
