//! httpcache entry point.
//!
//! Wires configuration, the throttled HTTP transport, the record store and
//! the blob root into a [`Cache`] and runs one command. Logs go to stderr
//! so stdout carries only the requested content.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use httpcache_client::{FetchConfig, HttpTransport, Throttle};
use httpcache_core::{AppConfig, BlobStore, Cache, RecordStore};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::Cli;

const THROTTLE_PAUSE_MS: u64 = 1_000;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(&cli);

    let mut config = AppConfig::load()?;
    if cli.throttle {
        config.pause_ms = THROTTLE_PAUSE_MS;
    }
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(root) = &cli.blob_root {
        config.blob_root = root.clone();
    }

    tracing::debug!(db = %config.db_path.display(), blobs = %config.blob_root.display(), "opening cache");

    let store = RecordStore::open(&config.db_path).await?;
    let transport = Throttle::new(HttpTransport::new(FetchConfig::from(&config))?, config.pause());
    let cache = Cache::new(store, BlobStore::new(&config.blob_root), transport, config.cache_options());

    let failed = commands::run(&cache, cli.action(), cli.json).await?;
    if failed > 0 {
        eprintln!("{failed} url(s) failed");
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}
