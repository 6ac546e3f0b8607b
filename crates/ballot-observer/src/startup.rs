//! Background startup helper for the binary.
//!
//! [`spawn_server`] binds eagerly so an unusable address fails startup,
//! then runs the server on its own task.

use std::future::Future;
use std::sync::Arc;

use ballot_core::config::ServerConfig;
use tokio::task::JoinHandle;

use crate::server::{self, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Bind `config`'s address and serve on a background task until
/// `shutdown` resolves.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address cannot be bound.
pub async fn spawn_server(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<()>, StartupError> {
    let listener = server::bind(config).await?;

    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state, shutdown).await {
            tracing::error!(error = %e, "Server exited with error");
        }
    });

    tracing::info!(port = config.port, "Server spawned on background task");
    Ok(handle)
}
