//! Error types for the server binary.

/// Top-level error for the server binary.
///
/// Everything past startup is absorbed and logged, so only configuration
/// and binding can end the process with an error.
#[derive(Debug, thiserror::Error)]
pub enum ServerBinError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ballot_core::config::ConfigError,
    },

    /// The HTTP server could not be started.
    #[error("startup error: {source}")]
    Startup {
        /// The underlying startup error.
        #[from]
        source: ballot_observer::startup::StartupError,
    },
}
