//! Shared application state for the HTTP layer.

use std::sync::Arc;

use ballot_types::Summary;
use chrono::{DateTime, Utc};

use crate::hub::Hub;

/// State handed to every handler.
///
/// The hub doubles as the read model: it always holds the last summary
/// it published, so snapshot reads never touch the tracker.
#[derive(Debug)]
pub struct AppState {
    /// Subscriber registry and latest summary.
    pub hub: Arc<Hub>,
    /// When this process started serving.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wrap a hub.
    pub fn new(hub: Arc<Hub>) -> Self {
        Self {
            hub,
            started_at: Utc::now(),
        }
    }

    /// Whole seconds since this process started serving.
    pub fn uptime_secs(&self) -> u64 {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        u64::try_from(elapsed.num_seconds()).unwrap_or(0)
    }

    /// The summary currently being served.
    pub fn current(&self) -> Option<Arc<Summary>> {
        self.hub.latest()
    }
}
