//! Fan-out of summaries to live stream subscribers.
//!
//! The [`Hub`] keeps two independent subscriber pools:
//!
//! - **legacy** subscribers receive bare [`Summary`] JSON frames,
//! - **versioned** subscribers receive [`StreamEnvelope`] frames and learn
//!   the process [`ServerEpoch`] on connect and on every keepalive.
//!
//! Each subscriber owns an unbounded channel, so a slow reader never
//! blocks the publisher or its peers. A failed send means the reader is
//! gone; its entry is removed by id after the broadcast loop finishes.
//!
//! All pool mutation happens under one lock. Subscribing sends the
//! greeting frames while holding it, so a concurrent publish can never
//! slip a frame in ahead of the `version` envelope.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use ballot_types::{ServerEpoch, StreamEnvelope, SubscriberId, Summary};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One serialized frame payload, shared by every recipient.
pub type Frame = Arc<str>;

/// Which pool a subscriber belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    /// Bare summary frames.
    Legacy,
    /// Typed envelope frames with epoch announcements.
    Versioned,
}

impl PoolKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Versioned => "versioned",
        }
    }
}

#[derive(Debug, Default)]
struct Pool {
    subscribers: BTreeMap<SubscriberId, mpsc::UnboundedSender<Frame>>,
}

impl Pool {
    /// Send `frame` to every subscriber, dropping those that are gone.
    /// Returns the number of successful deliveries.
    fn broadcast(&mut self, frame: &Frame, kind: PoolKind) -> usize {
        let failed: Vec<SubscriberId> = self
            .subscribers
            .iter()
            .filter(|(_, tx)| tx.send(Arc::clone(frame)).is_err())
            .map(|(id, _)| *id)
            .collect();

        for id in &failed {
            self.subscribers.remove(id);
            debug!(
                subscriber = %id,
                pool = kind.label(),
                remaining = self.subscribers.len(),
                "Removed dead subscriber"
            );
        }
        self.subscribers.len()
    }
}

#[derive(Debug, Default)]
struct HubState {
    legacy: Pool,
    versioned: Pool,
    latest: Option<Arc<Summary>>,
    closed: bool,
}

impl HubState {
    const fn pool_mut(&mut self, kind: PoolKind) -> &mut Pool {
        match kind {
            PoolKind::Legacy => &mut self.legacy,
            PoolKind::Versioned => &mut self.versioned,
        }
    }

    const fn pool(&self, kind: PoolKind) -> &Pool {
        match kind {
            PoolKind::Legacy => &self.legacy,
            PoolKind::Versioned => &self.versioned,
        }
    }
}

/// Subscriber registry and broadcaster.
#[derive(Debug)]
pub struct Hub {
    epoch: ServerEpoch,
    next_id: AtomicU64,
    state: Mutex<HubState>,
}

impl Hub {
    /// Create a hub for this process, optionally seeded with the summary
    /// restored at startup.
    pub fn new(epoch: ServerEpoch, latest: Option<Arc<Summary>>) -> Self {
        Self {
            epoch,
            next_id: AtomicU64::new(1),
            state: Mutex::new(HubState {
                latest,
                ..HubState::default()
            }),
        }
    }

    /// The process epoch announced to versioned subscribers.
    pub const fn epoch(&self) -> ServerEpoch {
        self.epoch
    }

    /// The most recently published summary.
    pub fn latest(&self) -> Option<Arc<Summary>> {
        self.lock().latest.clone()
    }

    /// Number of subscribers currently in `kind`'s pool.
    pub fn subscriber_count(&self, kind: PoolKind) -> usize {
        self.lock().pool(kind).subscribers.len()
    }

    /// Register a subscriber and queue its greeting frames.
    ///
    /// Versioned subscribers get a `version` envelope followed by an
    /// `election-data` envelope when a summary is held. Legacy
    /// subscribers get the held summary, if any. After [`Hub::close_all`]
    /// the returned subscription is already finished.
    pub fn subscribe(self: &Arc<Self>, kind: PoolKind) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = Subscription {
            id,
            kind,
            frames: rx,
            hub: Arc::downgrade(self),
        };

        let mut state = self.lock();
        if state.closed {
            return subscription;
        }

        let greeting = match kind {
            PoolKind::Legacy => vec![state.latest.as_deref().and_then(encode)],
            PoolKind::Versioned => {
                let now = Utc::now();
                vec![
                    encode(&StreamEnvelope::version(self.epoch, now)),
                    state
                        .latest
                        .as_deref()
                        .and_then(|s| encode(&StreamEnvelope::election_data(s.clone(), now))),
                ]
            }
        };
        for frame in greeting.into_iter().flatten() {
            // The receiver is still in hand, so this cannot fail.
            tx.send(frame).unwrap_or(());
        }

        let pool = state.pool_mut(kind);
        pool.subscribers.insert(id, tx);
        debug!(
            subscriber = %id,
            pool = kind.label(),
            size = pool.subscribers.len(),
            "Subscriber connected"
        );
        subscription
    }

    /// Record `summary` as the latest and push it to both pools.
    ///
    /// Returns the number of subscribers reached.
    pub fn publish(&self, summary: Arc<Summary>) -> usize {
        let bare = encode(&*summary);
        let envelope = encode(&StreamEnvelope::election_data(
            (*summary).clone(),
            Utc::now(),
        ));

        let mut state = self.lock();
        state.latest = Some(summary);

        let mut reached = 0usize;
        if let Some(frame) = bare {
            reached = reached.saturating_add(state.legacy.broadcast(&frame, PoolKind::Legacy));
        }
        if let Some(frame) = envelope {
            reached =
                reached.saturating_add(state.versioned.broadcast(&frame, PoolKind::Versioned));
        }
        reached
    }

    /// Push a `keepalive` envelope to versioned subscribers.
    ///
    /// Does nothing while the versioned pool is empty. Returns the number
    /// of subscribers still connected afterwards.
    pub fn keepalive(&self) -> usize {
        let mut state = self.lock();
        if state.versioned.subscribers.is_empty() {
            return 0;
        }
        encode(&StreamEnvelope::keepalive(self.epoch, Utc::now()))
            .map_or(0, |frame| state.versioned.broadcast(&frame, PoolKind::Versioned))
    }

    /// Disconnect every subscriber and refuse new ones.
    pub fn close_all(&self) {
        let mut state = self.lock();
        state.closed = true;
        let legacy = std::mem::take(&mut state.legacy.subscribers).len();
        let versioned = std::mem::take(&mut state.versioned.subscribers).len();
        info!(legacy, versioned, "Closed all subscriber streams");
    }

    fn remove(&self, kind: PoolKind, id: SubscriberId) {
        let mut state = self.lock();
        let pool = state.pool_mut(kind);
        if pool.subscribers.remove(&id).is_some() {
            debug!(
                subscriber = %id,
                pool = kind.label(),
                remaining = pool.subscribers.len(),
                "Subscriber disconnected"
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Receiving end of one subscriber. Dropping it leaves the pool.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    kind: PoolKind,
    frames: mpsc::UnboundedReceiver<Frame>,
    hub: Weak<Hub>,
}

impl Subscription {
    /// This subscriber's id.
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next frame. `None` once the hub has closed the stream.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }

    /// Take a queued frame without waiting.
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.frames.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.kind, self.id);
        }
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Option<Frame> {
    match serde_json::to_string(value) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            warn!(error = %e, "Failed to serialize stream frame");
            None
        }
    }
}
