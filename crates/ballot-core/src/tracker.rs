//! The polling tracker.
//!
//! A [`Tracker`] owns the current [`Summary`] and a background loop that
//! periodically runs one pipeline pass:
//!
//! 1. resolve the artifact's current version from the source,
//! 2. stop early if the version matches the held summary,
//! 3. download and aggregate the report,
//! 4. apply the supersession rule, then persist and broadcast.
//!
//! Passes never overlap: the loop awaits each one before the next tick.
//! A failed pass emits [`TrackerEvent::Error`] and leaves the held summary
//! untouched; polling continues on the next tick.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use ballot_types::Summary;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aggregate::{self, ReportLayout};
use crate::change;
use crate::error::TrackerError;
use crate::source::ReportSource;
use crate::store::SnapshotStore;

/// Capacity of the event channel. Slow receivers lag rather than block.
const EVENT_CAPACITY: usize = 64;

/// Notification emitted by the tracker.
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    /// A new summary was accepted.
    Update(Arc<Summary>),
    /// A pass failed. The held summary is unchanged.
    Error {
        /// What went wrong.
        error: Arc<TrackerError>,
        /// When the pass failed.
        at: DateTime<Utc>,
    },
}

/// Result of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// A newer summary replaced the held one.
    Updated(Arc<Summary>),
    /// The published version matches the held one; nothing was downloaded.
    UpToDate,
    /// The report was aggregated but rejected by the supersession rule.
    Unchanged,
}

/// Handle to the running poll loop.
struct Poller {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Polls a [`ReportSource`] and holds the latest accepted summary.
pub struct Tracker<S> {
    source: S,
    store: SnapshotStore,
    layout: ReportLayout,
    interval: Duration,
    current: ArcSwapOption<Summary>,
    events: broadcast::Sender<TrackerEvent>,
    poller: Mutex<Option<Poller>>,
}

impl<S: ReportSource> Tracker<S> {
    /// Create a tracker seeded from the snapshot store.
    ///
    /// An unusable snapshot is logged and ignored. No network activity
    /// happens until [`Tracker::start`].
    pub async fn new(
        source: S,
        store: SnapshotStore,
        layout: ReportLayout,
        interval: Duration,
    ) -> Self {
        let seed = store.load_seed().await.map(Arc::new);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            source,
            store,
            layout,
            interval,
            current: ArcSwapOption::new(seed),
            events,
            poller: Mutex::new(None),
        }
    }

    /// The currently held summary, if any.
    pub fn current(&self) -> Option<Arc<Summary>> {
        self.current.load_full()
    }

    /// Subscribe to update and error events.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    /// Whether the poll loop is active.
    pub fn is_running(&self) -> bool {
        self.poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Start polling. The first pass runs immediately.
    ///
    /// Returns `false` without side effects if already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut slot = self.poller.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            warn!("Tracker already running, ignoring start");
            return false;
        }

        let cancel = CancellationToken::new();
        let tracker = Arc::clone(self);
        let token = cancel.clone();
        let handle = tokio::spawn(async move { tracker.poll_loop(token).await });

        info!(interval_secs = self.interval.as_secs(), "Tracker started");
        *slot = Some(Poller { cancel, handle });
        true
    }

    /// Stop polling and flush the held summary to disk.
    ///
    /// An in-flight pass is abandoned and has fully unwound before the
    /// flush starts. Calling this while idle only repeats the flush.
    pub async fn stop(&self) {
        let poller = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(Poller { cancel, handle }) = poller {
            cancel.cancel();
            handle.abort();
            if let Some(e) = handle.await.err().filter(|e| !e.is_cancelled()) {
                warn!(error = %e, "Poll loop ended abnormally");
            }
            info!("Tracker stopped");
        }

        if let Some(summary) = self.current() {
            self.persist(&summary).await;
        }
    }

    async fn poll_loop(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => self.poll_once().await,
            }
        }
        debug!("Poll loop exited");
    }

    /// Run one pass and report failures as events.
    async fn poll_once(&self) {
        if let Err(e) = self.run_pass().await {
            warn!(error = %e, "Update pass failed");
            let event = TrackerEvent::Error {
                error: Arc::new(e),
                at: Utc::now(),
            };
            self.events.send(event).unwrap_or(0);
        }
    }

    /// Run one pipeline pass.
    ///
    /// # Errors
    ///
    /// Returns the first [`TrackerError`] raised by resolution, download
    /// or extraction. Malformed report rows are skipped, not errors.
    pub async fn run_pass(&self) -> Result<PassOutcome, TrackerError> {
        let entry = self.source.resolve().await?;

        let held = self.current.load_full();
        if !change::is_new_version(held.as_deref(), entry.timestamp) {
            debug!(timestamp = entry.timestamp, "Published version unchanged");
            return Ok(PassOutcome::UpToDate);
        }

        let text = self.source.fetch(&entry).await?;
        let aggregation = aggregate::aggregate(&text, entry.timestamp, &self.layout, Utc::now());
        if aggregation.skipped_rows > 0 {
            warn!(
                skipped = aggregation.skipped_rows,
                accepted = aggregation.rows,
                "Report contained malformed rows"
            );
        }

        let candidate = Arc::new(aggregation.summary);
        let held = self.current.load_full();
        if !change::should_accept(held.as_deref(), &candidate) {
            return Ok(PassOutcome::Unchanged);
        }

        self.current.store(Some(Arc::clone(&candidate)));
        self.persist(&candidate).await;

        let receivers = self
            .events
            .send(TrackerEvent::Update(Arc::clone(&candidate)))
            .unwrap_or(0);
        info!(
            timestamp = candidate.timestamp,
            regions = candidate.regions.len(),
            total_votes = candidate.total_votes,
            total_a = candidate.total_a,
            total_b = candidate.total_b,
            receivers,
            "Accepted new summary"
        );

        Ok(PassOutcome::Updated(candidate))
    }

    async fn persist(&self, summary: &Summary) {
        if let Err(e) = self.store.save(summary).await {
            warn!(error = %e, "Failed to persist summary");
        }
    }
}
