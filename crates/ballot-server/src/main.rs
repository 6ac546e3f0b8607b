//! Ballot tracker server binary.
//!
//! Wires the polling tracker to the subscriber hub and serves the HTTP
//! API until a shutdown signal arrives.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `BALLOT_CONFIG` (default
//!    `ballot-config.yaml`) plus environment overrides
//! 3. Create the tracker, seeded from the snapshot file
//! 4. Create the hub with a fresh process epoch
//! 5. Spawn the hub bridge and the keepalive ticker
//! 6. Bind and spawn the HTTP server
//! 7. Start polling
//!
//! # Shutdown
//!
//! On Ctrl-C or SIGTERM the tracker stops and flushes its summary, the
//! hub closes every stream, and the server drains in-flight requests.

mod bridge;
mod error;
mod keepalive;

use std::path::PathBuf;
use std::sync::Arc;

use ballot_core::config::BallotConfig;
use ballot_core::source::PublisherSource;
use ballot_core::store::SnapshotStore;
use ballot_core::tracker::Tracker;
use ballot_observer::startup::spawn_server;
use ballot_observer::{AppState, Hub};
use ballot_types::ServerEpoch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::bridge::HubBridge;
use crate::error::ServerBinError;

/// Environment variable naming the YAML configuration file.
const CONFIG_PATH_ENV: &str = "BALLOT_CONFIG";

/// Configuration file used when [`CONFIG_PATH_ENV`] is unset.
const DEFAULT_CONFIG_PATH: &str = "ballot-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the server cannot
/// bind its address.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("ballot-server starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        config_url = config.publisher.config_url,
        poll_interval_secs = config.tracker.poll_interval_secs,
        cache_file = config.tracker.cache_file,
        port = config.server.port,
        "Configuration loaded"
    );

    // 3. Tracker.
    let tracker = Arc::new(
        Tracker::new(
            PublisherSource::new(config.publisher.clone()),
            SnapshotStore::new(&config.tracker.cache_file),
            config.report.clone(),
            config.tracker.poll_interval(),
        )
        .await,
    );
    if tracker.current().is_some() {
        info!("Found saved data from a previous session");
    } else {
        info!("No saved data, waiting for the first download");
    }

    // 4. Hub.
    let hub = Arc::new(Hub::new(ServerEpoch::generate(), tracker.current()));
    info!(epoch = %hub.epoch(), "Hub ready");

    // 5. Background tasks.
    let cancel = CancellationToken::new();
    let bridge = tokio::spawn(
        HubBridge::new(Arc::clone(&hub)).run(tracker.subscribe(), cancel.clone()),
    );
    let pinger = tokio::spawn(keepalive::run(
        Arc::clone(&hub),
        config.hub.keepalive_interval(),
        cancel.clone(),
    ));

    // 6. HTTP server.
    let state = Arc::new(AppState::new(Arc::clone(&hub)));
    let server_cancel = cancel.clone();
    let server = spawn_server(&config.server, state, async move {
        server_cancel.cancelled().await;
    })
    .await
    .map_err(ServerBinError::from)?;

    // 7. Poll.
    tracker.start();

    shutdown_signal().await;
    info!("Shutdown requested");

    tracker.stop().await;
    hub.close_all();
    cancel.cancel();

    for (name, handle) in [("bridge", bridge), ("keepalive", pinger), ("server", server)] {
        if let Err(e) = handle.await {
            warn!(task = name, error = %e, "Background task ended abnormally");
        }
    }

    info!("ballot-server stopped, data saved");
    Ok(())
}

/// Load configuration from the file named by `BALLOT_CONFIG`.
///
/// A missing file yields defaults; environment overrides apply either way.
fn load_config() -> Result<BallotConfig, ServerBinError> {
    let path = std::env::var_os(CONFIG_PATH_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if !path.exists() {
        info!(path = %path.display(), "Config file not found, using defaults");
    }
    Ok(BallotConfig::load(&path)?)
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
