//! Error types for the ingestion pipeline.
//!
//! Every variant aborts only the pass that raised it. The tracker turns it
//! into an error event and keeps polling; the held summary is untouched.

/// Failures that abort a single pipeline pass.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The configuration index could not be downloaded.
    #[error("failed to fetch config: {0}")]
    ConfigFetch(String),

    /// The configuration index was downloaded but is not a valid document.
    #[error("failed to decode config: {0}")]
    ConfigDecode(#[from] prost::DecodeError),

    /// The index does not list the expected artifact.
    #[error("artifact {category}/{name} not found in configuration")]
    ArtifactNotFound {
        /// Category that was searched.
        category: String,
        /// File name that was searched.
        name: String,
    },

    /// The archive could not be downloaded.
    #[error("failed to download archive: {0}")]
    ArchiveFetch(String),

    /// The archive was downloaded but could not be read.
    #[error("archive is unreadable: {0}")]
    ArchiveCorrupt(String),

    /// The archive does not contain the expected member.
    #[error("file {member} not found in archive")]
    ArchiveMemberMissing {
        /// Name of the missing member.
        member: String,
    },
}
