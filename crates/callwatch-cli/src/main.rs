//! # callwatch
//!
//! Follow a call's transcription progress from the terminal.
//!
//! ## Usage
//!
//! ```bash
//! # Watch a single call
//! callwatch 3f2a9c1e
//!
//! # Watch with a custom config
//! callwatch 3f2a9c1e --config /path/to/callwatch.toml
//!
//! # Follow every call of the current user
//! callwatch --calls
//!
//! # Override endpoints and token through the environment
//! CALLWATCH_WS_URL=wss://calls.example.com CALLWATCH_TOKEN=... callwatch 3f2a9c1e
//! ```

use anyhow::{bail, Result};
use clap::Parser;
use callwatch_cli::api::ApiClient;
use callwatch_cli::auth::TokenStore;
use callwatch_cli::config::Config;
use callwatch_cli::controller::CallDetailController;
use callwatch_cli::view::CallView;
use callwatch_cli::feed;
use callwatch_cli::metrics::{init_metrics, start_metrics_server};
use callwatch_core::RealtimeClient;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Follow a call's transcription progress from the terminal.
#[derive(Parser, Debug)]
#[command(name = "callwatch", about = "Follow call transcription progress")]
struct Args {
    /// Call to watch
    #[arg(required_unless_present = "calls")]
    call_id: Option<String>,

    /// Follow every call of the current user instead of a single one
    #[arg(long, conflicts_with = "call_id")]
    calls: bool,

    /// Path to the configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn print_view(view: &mut CallView) {
    for notice in view.take_notices() {
        eprintln!("{}", notice);
    }
    println!("{}", view.render());
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Interrupted");
}

async fn run_call(config: &Config, call_id: String, token: Option<String>) -> Result<()> {
    let api = ApiClient::new(&config.api.base_url, config.request_timeout())?
        .with_token(token.clone());
    let client = RealtimeClient::with_websocket(config.client_config(), config.websocket_config());

    let mut controller = CallDetailController::new(call_id, api, client)
        .with_heartbeat(config.heartbeat_interval());

    let result = match controller.mount(token.as_deref()).await {
        Ok(()) => controller.run(interrupted(), print_view).await,
        Err(e) => Err(e),
    };

    // Always unmount, even when the snapshot failed.
    controller.unmount().await;
    for notice in controller.take_notices() {
        eprintln!("{}", notice);
    }
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "callwatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if config.metrics.enabled {
        init_metrics();
        if let Err(e) = start_metrics_server(config.metrics.port) {
            warn!(error = %e, "Metrics exporter not started");
        }
    }

    let token = TokenStore::from_config(&config.auth).load()?;

    if let Some(call_id) = args.call_id {
        return run_call(&config, call_id, token).await;
    }

    let Some(token) = token else {
        bail!("No access token; set CALLWATCH_TOKEN or write one to {}", config.auth.token_file);
    };
    let mut client = RealtimeClient::with_websocket(config.client_config(), config.websocket_config());
    feed::watch_calls(&mut client, &token, interrupted(), |line| println!("{}", line)).await
}
