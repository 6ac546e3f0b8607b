//! Configuration loading and typed config structures for the ballot tracker.
//!
//! The optional configuration file is `ballot-config.yaml`. Every field
//! has a default matching the live presidential run-off publication, so
//! an absent file is equivalent to an empty one. Environment variables
//! override file values for the settings most often changed per
//! deployment.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::aggregate::ReportLayout;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level tracker configuration.
///
/// Mirrors the structure of `ballot-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BallotConfig {
    /// Where and what to download.
    #[serde(default)]
    pub publisher: PublisherConfig,

    /// Polling cadence and cache location.
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Column layout of the delimited report.
    #[serde(default)]
    pub report: ReportLayout,

    /// HTTP listener.
    #[serde(default)]
    pub server: ServerConfig,

    /// Subscriber distribution.
    #[serde(default)]
    pub hub: HubConfig,
}

impl BallotConfig {
    /// Load configuration from a YAML file, falling back to defaults when
    /// the file does not exist. Environment overrides are applied and the
    /// result is validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if an existing file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_yml::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string without environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    ///
    /// - `BALLOT_CONFIG_URL` overrides `publisher.config_url`
    /// - `BALLOT_ARCHIVE_BASE_URL` overrides `publisher.archive_base_url`
    /// - `BALLOT_POLL_INTERVAL_SECS` overrides `tracker.poll_interval_secs`
    /// - `BALLOT_CACHE_FILE` overrides `tracker.cache_file`
    /// - `HOST` / `PORT` override `server.host` / `server.port`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Unparsable numeric values are ignored and the previous value kept.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("BALLOT_CONFIG_URL") {
            self.publisher.config_url = val;
        }
        if let Some(val) = lookup("BALLOT_ARCHIVE_BASE_URL") {
            self.publisher.archive_base_url = val;
        }
        if let Some(secs) = lookup("BALLOT_POLL_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            self.tracker.poll_interval_secs = secs;
        }
        if let Some(val) = lookup("BALLOT_CACHE_FILE") {
            self.tracker.cache_file = val;
        }
        if let Some(val) = lookup("HOST") {
            self.server.host = val;
        }
        if let Some(port) = lookup("PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Reject settings the tracker cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tracker.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "tracker.poll_interval_secs must be positive".to_owned(),
            ));
        }
        if self.hub.keepalive_secs == 0 {
            return Err(ConfigError::Invalid(
                "hub.keepalive_secs must be positive".to_owned(),
            ));
        }
        if self.publisher.config_url.is_empty() || self.publisher.archive_base_url.is_empty() {
            return Err(ConfigError::Invalid("publisher URLs must not be empty".to_owned()));
        }
        if !self.report.delimiter.is_ascii() {
            return Err(ConfigError::Invalid(format!(
                "report.delimiter must be a single ASCII character, got {:?}",
                self.report.delimiter
            )));
        }
        if !self.report.covers_columns() {
            return Err(ConfigError::Invalid(format!(
                "report.min_fields ({}) does not cover every used column",
                self.report.min_fields
            )));
        }
        Ok(())
    }
}

/// Publisher endpoints and artifact names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublisherConfig {
    /// URL of the binary configuration index.
    #[serde(default = "default_config_url")]
    pub config_url: String,

    /// Archive URL without the `.<timestamp>.zip` suffix.
    #[serde(default = "default_archive_base_url")]
    pub archive_base_url: String,

    /// Index category that lists the report.
    #[serde(default = "default_category")]
    pub category: String,

    /// File name of the report inside the category.
    #[serde(default = "default_artifact_name")]
    pub artifact_name: String,

    /// Member to extract from the downloaded archive.
    #[serde(default = "default_member_name")]
    pub member_name: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            config_url: default_config_url(),
            archive_base_url: default_archive_base_url(),
            category: default_category(),
            artifact_name: default_artifact_name(),
            member_name: default_member_name(),
        }
    }
}

/// Polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrackerConfig {
    /// Seconds between pipeline passes.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Path of the last-known-good summary document.
    #[serde(default = "default_cache_file")]
    pub cache_file: String,
}

impl TrackerConfig {
    /// Poll interval as a [`Duration`].
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            cache_file: default_cache_file(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Distribution hub settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HubConfig {
    /// Seconds between keepalive frames on the versioned stream.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
}

impl HubConfig {
    /// Keepalive period as a [`Duration`].
    pub const fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            keepalive_secs: default_keepalive_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_config_url() -> String {
    "https://wybory.gov.pl/prezydent2025/data/config.blob".to_owned()
}

fn default_archive_base_url() -> String {
    "https://wybory.gov.pl/prezydent2025/data/csv/protokoly_po_obwodach_w_drugiej_turze_csv"
        .to_owned()
}

fn default_category() -> String {
    "csv".to_owned()
}

fn default_artifact_name() -> String {
    "protokoly_po_obwodach_w_drugiej_turze_csv.zip".to_owned()
}

fn default_member_name() -> String {
    "protokoly_po_obwodach_w_drugiej_turze_utf8.csv".to_owned()
}

const fn default_poll_interval_secs() -> u64 {
    30
}

fn default_cache_file() -> String {
    "cached-elections.json".to_owned()
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    3000
}

const fn default_keepalive_secs() -> u64 {
    10
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = BallotConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tracker.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.hub.keepalive_interval(), Duration::from_secs(10));
        assert_eq!(config.publisher.category, "csv");
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = "tracker:\n  poll_interval_secs: 5\nreport:\n  abroad_label: zagranica\n";
        let config = BallotConfig::parse(yaml).unwrap_or_default();
        assert_eq!(config.tracker.poll_interval_secs, 5);
        assert_eq!(config.report.abroad_label, "zagranica");
        // Everything else uses defaults
        assert_eq!(config.tracker.cache_file, "cached-elections.json");
        assert_eq!(config.report.min_fields, 31);
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(BallotConfig::parse("").is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result = BallotConfig::parse("tracker:\n  poll_interval_secs: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn layout_must_cover_columns() {
        let yaml = "report:\n  min_fields: 10\n";
        assert!(matches!(BallotConfig::parse(yaml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn overrides_replace_file_values() {
        let vars: BTreeMap<&str, &str> = [
            ("PORT", "8081"),
            ("BALLOT_POLL_INTERVAL_SECS", "12"),
            ("BALLOT_CACHE_FILE", "/tmp/cache.json"),
        ]
        .into_iter()
        .collect();

        let mut config = BallotConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| (*v).to_owned()));

        assert_eq!(config.server.port, 8081);
        assert_eq!(config.tracker.poll_interval_secs, 12);
        assert_eq!(config.tracker.cache_file, "/tmp/cache.json");
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn unparsable_override_keeps_previous_value() {
        let mut config = BallotConfig::default();
        config.apply_overrides(|name| (name == "PORT").then(|| "not-a-port".to_owned()));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("does-not-exist.yaml");
        assert!(BallotConfig::load(&path).is_ok());
    }
}
