//! Identifier newtypes shared by the tracker and the distribution hub.
//!
//! [`ServerEpoch`] is the opaque per-process token that subscribers compare
//! to detect a restart. [`SubscriberId`] indexes a live connection inside
//! one distribution pool.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Random token generated once at process start.
///
/// Subscribers only ever compare two epochs for equality: a mismatch means
/// the server restarted and the client must fully resynchronize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(transparent)]
pub struct ServerEpoch(Uuid);

impl ServerEpoch {
    /// Generate a fresh random epoch (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl core::fmt::Display for ServerEpoch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ServerEpoch {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Opaque handle of one subscriber connection within a pool.
///
/// Ids are allocated monotonically and never reused for the lifetime of
/// the pool, so removing a stale id can never evict a newer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(pub u64);

impl core::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn epochs_are_unique() {
        assert_ne!(ServerEpoch::generate(), ServerEpoch::generate());
    }

    #[test]
    fn epoch_serializes_as_plain_string() {
        let epoch = ServerEpoch::from(Uuid::nil());
        let json = serde_json::to_string(&epoch).unwrap_or_default();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }

    #[test]
    fn subscriber_id_ordering_follows_allocation() {
        assert!(SubscriberId(1) < SubscriberId(2));
        assert_eq!(SubscriberId(7).to_string(), "sub-7");
    }
}
