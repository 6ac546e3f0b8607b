//! Bridge from tracker events to the subscriber hub.
//!
//! Every accepted summary is published to the hub and logged as a
//! standings table. Failed passes are logged with their capture time;
//! they never reach subscribers.

use std::sync::Arc;

use ballot_core::display;
use ballot_core::tracker::TrackerEvent;
use ballot_observer::Hub;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Forwards [`TrackerEvent`]s to a [`Hub`].
pub struct HubBridge {
    hub: Arc<Hub>,
}

impl HubBridge {
    /// Create a bridge publishing into `hub`.
    pub const fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    /// React to a single event.
    pub fn handle(&self, event: TrackerEvent) {
        match event {
            TrackerEvent::Update(summary) => {
                let reached = self.hub.publish(Arc::clone(&summary));
                info!(
                    timestamp = summary.timestamp,
                    reached, "New election data broadcast"
                );
                info!("Current standings\n{}", display::render(&summary));
            }
            TrackerEvent::Error { error, at } => {
                error!(%at, error = %error, "Election data update failed");
            }
        }
    }

    /// Consume events until the channel closes or `cancel` fires.
    pub async fn run(
        self,
        mut events: broadcast::Receiver<TrackerEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                received = events.recv() => match received {
                    Ok(event) => self.handle(event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Hub bridge lagged behind tracker events");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        debug!("Hub bridge exited");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use ballot_core::error::TrackerError;
    use ballot_observer::PoolKind;
    use ballot_types::{RegionSummary, ServerEpoch, Summary};
    use chrono::Utc;

    use super::*;

    fn summary(timestamp: i64) -> Arc<Summary> {
        let mut region = RegionSummary::new("opolskie".to_owned());
        region.record(1, 4, 6);
        Arc::new(Summary::from_regions(timestamp, vec![region], Utc::now()))
    }

    fn hub() -> Arc<Hub> {
        Arc::new(Hub::new(ServerEpoch::generate(), None))
    }

    #[test]
    fn update_is_published() {
        let hub = hub();
        let mut sub = hub.subscribe(PoolKind::Legacy);

        HubBridge::new(Arc::clone(&hub)).handle(TrackerEvent::Update(summary(5)));

        assert_eq!(hub.latest().unwrap().timestamp, 5);
        assert!(sub.try_recv().is_some());
    }

    #[test]
    fn error_is_not_published() {
        let hub = hub();
        let mut sub = hub.subscribe(PoolKind::Legacy);

        HubBridge::new(Arc::clone(&hub)).handle(TrackerEvent::Error {
            error: Arc::new(TrackerError::ConfigFetch("timeout".to_owned())),
            at: Utc::now(),
        });

        assert!(hub.latest().is_none());
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn run_forwards_until_sender_dropped() {
        let hub = hub();
        let (tx, rx) = broadcast::channel(4);
        let task = tokio::spawn(HubBridge::new(Arc::clone(&hub)).run(rx, CancellationToken::new()));

        tx.send(TrackerEvent::Update(summary(1))).unwrap();
        tx.send(TrackerEvent::Update(summary(2))).unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(hub.latest().unwrap().timestamp, 2);
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let (_tx, rx) = broadcast::channel::<TrackerEvent>(4);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(HubBridge::new(hub()).run(rx, cancel.clone()));

        cancel.cancel();
        task.await.unwrap();
    }
}
