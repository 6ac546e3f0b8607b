//! Periodic keepalive pings for versioned subscribers.

use std::sync::Arc;
use std::time::Duration;

use ballot_observer::Hub;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Ping the hub's versioned pool every `period` until cancelled.
///
/// The first ping is sent one full period after start.
pub async fn run(hub: Arc<Hub>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let connected = hub.keepalive();
                if connected > 0 {
                    debug!(connected, "Keepalive sent");
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use ballot_observer::PoolKind;
    use ballot_types::{EnvelopeKind, ServerEpoch, StreamEnvelope};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn pings_each_period_until_cancelled() {
        let hub = Arc::new(Hub::new(ServerEpoch::generate(), None));
        let mut sub = hub.subscribe(PoolKind::Versioned);
        sub.recv().await.unwrap();

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(Arc::clone(&hub), Duration::from_secs(10), cancel.clone()));

        for _ in 0..2 {
            let frame = sub.recv().await.unwrap();
            let envelope: StreamEnvelope = serde_json::from_str(&frame).unwrap();
            assert_eq!(envelope.kind, EnvelopeKind::Keepalive);
            assert_eq!(envelope.epoch(), Some(hub.epoch()));
        }

        cancel.cancel();
        task.await.unwrap();
    }
}
