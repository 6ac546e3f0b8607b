//! Typed envelopes for the versioned subscriber stream.
//!
//! Every frame on the versioned stream is a JSON object
//! `{"type": ..., "data": ..., "timestamp": ...}`. The `type` tells the
//! client how to read `data`:
//!
//! | `type` | `data` |
//! |--------|--------|
//! | `version` | `{"serverVersion": <epoch>}` |
//! | `election-data` | full [`Summary`] |
//! | `keepalive` | `{"serverVersion": <epoch>}` |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::ServerEpoch;
use crate::summary::Summary;

/// Discriminant of a [`StreamEnvelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum EnvelopeKind {
    /// First frame on every connection; carries the process epoch.
    Version,
    /// A complete summary snapshot.
    ElectionData,
    /// Periodic liveness frame; carries the process epoch.
    Keepalive,
}

/// Epoch payload of `version` and `keepalive` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct VersionInfo {
    /// Process epoch of the sending server.
    pub server_version: ServerEpoch,
}

/// Body of a [`StreamEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export, export_to = "bindings/")]
pub enum EnvelopeData {
    /// Epoch carried by `version` and `keepalive`.
    Version(VersionInfo),
    /// Summary carried by `election-data`.
    Summary(Summary),
}

/// One frame of the versioned stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StreamEnvelope {
    /// Frame discriminant, serialized as `type`.
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    /// Frame body.
    pub data: EnvelopeData,
    /// Send time.
    pub timestamp: DateTime<Utc>,
}

impl StreamEnvelope {
    /// Build a `version` frame.
    pub const fn version(epoch: ServerEpoch, at: DateTime<Utc>) -> Self {
        Self {
            kind: EnvelopeKind::Version,
            data: EnvelopeData::Version(VersionInfo {
                server_version: epoch,
            }),
            timestamp: at,
        }
    }

    /// Build a `keepalive` frame.
    pub const fn keepalive(epoch: ServerEpoch, at: DateTime<Utc>) -> Self {
        Self {
            kind: EnvelopeKind::Keepalive,
            data: EnvelopeData::Version(VersionInfo {
                server_version: epoch,
            }),
            timestamp: at,
        }
    }

    /// Build an `election-data` frame.
    pub const fn election_data(summary: Summary, at: DateTime<Utc>) -> Self {
        Self {
            kind: EnvelopeKind::ElectionData,
            data: EnvelopeData::Summary(summary),
            timestamp: at,
        }
    }

    /// Epoch carried by this frame, if any.
    pub const fn epoch(&self) -> Option<ServerEpoch> {
        match &self.data {
            EnvelopeData::Version(info) => Some(info.server_version),
            EnvelopeData::Summary(_) => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn version_frame_wire_shape() {
        let epoch = ServerEpoch::generate();
        let frame = StreamEnvelope::version(epoch, Utc::now());
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "version");
        assert_eq!(json["data"]["serverVersion"], epoch.to_string());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn election_data_frame_carries_summary() {
        let summary = Summary::from_regions(1_748_821_425, Vec::new(), Utc::now());
        let frame = StreamEnvelope::election_data(summary, Utc::now());
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "election-data");
        assert_eq!(json["data"]["timestamp"], 1_748_821_425);
        assert_eq!(frame.epoch(), None);
    }

    #[test]
    fn keepalive_frame_parses_back() {
        let epoch = ServerEpoch::generate();
        let text = serde_json::to_string(&StreamEnvelope::keepalive(epoch, Utc::now())).unwrap();
        let parsed: StreamEnvelope = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.kind, EnvelopeKind::Keepalive);
        assert_eq!(parsed.epoch(), Some(epoch));
    }
}
