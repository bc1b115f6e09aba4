//! Storefront CLI - browse the shop, manage the cart, check out and run the
//! back office from a terminal.

mod app;
mod cli;
mod format;

use std::io;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storefront_core::{ApiError, Config};

use app::App;
use cli::Cli;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing();

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    info!(api = %config.api_base_url, "Storefront starting");

    let mut app = App::new(config)?;
    if let Err(e) = app.run(cli.command).await {
        eprintln!("Error: {:#}", e);
        if ApiError::find(&e).is_some_and(ApiError::requires_sign_in) {
            eprintln!("Sign in with: storefront login");
        }
        std::process::exit(1);
    }

    Ok(())
}
