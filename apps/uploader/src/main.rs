//! mediadrop uploader entry point.

mod app;
mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image files to upload (JPEG, PNG or GIF)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Configuration file (defaults to the per-user config path)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Part size in bytes, overrides the configuration file
    #[arg(long)]
    chunk_size: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        files = args.files.len(),
        "starting mediadrop uploader"
    );

    let mut config = config::Config::load(args.config.as_deref())?;
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    config.validate()?;
    if config.api_key.is_empty() {
        tracing::warn!(
            env = config::API_KEY_ENV,
            "no API key configured, requests will likely be rejected"
        );
    }
    tracing::info!(
        staging = %config.staging_url,
        chunk_size = config.chunk_size,
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config, args.files))
}
