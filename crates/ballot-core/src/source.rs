//! Where a pass gets its data from.
//!
//! The [`Tracker`](crate::tracker::Tracker) is generic over
//! [`ReportSource`] so the pipeline can be driven by the live publisher or
//! by an in-memory stub in tests.

use std::future::Future;

use crate::config::PublisherConfig;
use crate::error::TrackerError;
use crate::fetch::Publisher;
use crate::index::{ArtifactEntry, PublishedArtifactIndex};

/// Supplier of the current artifact version and its report text.
pub trait ReportSource: Send + Sync + 'static {
    /// Resolve the current version of the tracked artifact.
    ///
    /// # Errors
    ///
    /// Returns a fetch, decode or not-found [`TrackerError`].
    fn resolve(&self) -> impl Future<Output = Result<ArtifactEntry, TrackerError>> + Send;

    /// Download and extract the report for a resolved version.
    ///
    /// # Errors
    ///
    /// Returns an archive fetch or extraction [`TrackerError`].
    fn fetch(
        &self,
        entry: &ArtifactEntry,
    ) -> impl Future<Output = Result<String, TrackerError>> + Send;
}

/// Live source backed by the publisher's HTTP endpoints.
#[derive(Debug, Clone)]
pub struct PublisherSource {
    publisher: Publisher,
    config: PublisherConfig,
}

impl PublisherSource {
    /// Create a source for the configured publisher.
    pub fn new(config: PublisherConfig) -> Self {
        Self {
            publisher: Publisher::new(),
            config,
        }
    }
}

impl ReportSource for PublisherSource {
    async fn resolve(&self) -> Result<ArtifactEntry, TrackerError> {
        let bytes = self.publisher.fetch_config(&self.config.config_url).await?;
        let index = PublishedArtifactIndex::decode(&bytes)?;
        index.resolve(&self.config.category, &self.config.artifact_name)
    }

    async fn fetch(&self, entry: &ArtifactEntry) -> Result<String, TrackerError> {
        let url = entry.download_url(&self.config.archive_base_url);
        self.publisher
            .fetch_report(&url, &self.config.member_name)
            .await
    }
}
