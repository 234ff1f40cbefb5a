//! fleetctl
//!
//! Command-line client for the fleet dashboard API. Keeps the session's
//! token pair in a local store and prints every result as a JSON envelope.

mod cli;
mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fleet_api::{ApiClient, ClientConfig};
use fleet_auth::{StoreBackend, open_store};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;
use crate::commands::CliRedirect;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();

    let (config_path, explicit) = Config::resolve_path(cli.config.as_deref());
    let config = Config::load_or_default(&config_path, explicit)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    debug!(
        path = %config_path.display(),
        base_url = %config.api.base_url,
        store = config.store.backend.as_str(),
        "config loaded"
    );

    let token_path = match config.store.backend {
        StoreBackend::File => config.token_path()?,
        StoreBackend::Memory => PathBuf::new(),
    };
    let store = open_store(config.store.backend, &token_path)
        .await
        .with_context(|| format!("opening token store at {}", token_path.display()))?;

    let client = ApiClient::new(
        ClientConfig::new(config.api.base_url.as_str()).with_timeout(config.timeout()),
        store,
        Arc::new(CliRedirect),
    )?;

    let envelope = commands::run(cli.command, &client).await?;
    commands::print(&envelope)?;

    Ok(if envelope.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Logs go to stderr so stdout stays machine-readable.
///
/// Filter from LOG_LEVEL, then RUST_LOG, else `warn`. LOG_FORMAT=json
/// switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
