//! removebg-saver command-line tool
//!
//! Removes image backgrounds through the remove.bg API and saves the results
//! to a local photo album.

#[cfg(feature = "cli")]
use removebg_saver::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
