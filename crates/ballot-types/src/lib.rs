//! Shared type definitions for the ballot tracker.
//!
//! This crate is the single source of truth for every value that crosses
//! a boundary: the persisted cache document, the REST snapshot and the
//! two subscriber streams. Types flow downstream to `TypeScript` via
//! `ts-rs` for the viewing client.
//!
//! # Modules
//!
//! - [`summary`] -- Aggregated national and regional totals
//! - [`envelope`] -- Typed frames of the versioned stream
//! - [`ids`] -- Process epoch and subscriber handles

pub mod envelope;
pub mod ids;
pub mod summary;

// Re-export all public types at crate root for convenience.
pub use envelope::{EnvelopeData, EnvelopeKind, StreamEnvelope, VersionInfo};
pub use ids::{ServerEpoch, SubscriberId};
pub use summary::{RegionSummary, Summary};
