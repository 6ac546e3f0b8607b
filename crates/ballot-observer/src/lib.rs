//! Distribution layer for the ballot tracker.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **SSE streams** fed by the [`Hub`]: a legacy stream of bare summary
//!   frames (`/api/elections/stream`) and a versioned stream of typed
//!   envelopes with restart detection (`/api/elections/stream2`)
//! - **JSON endpoints** for the current summary and liveness
//! - **HTML status page** (`GET /`) with `ETag` validation
//!
//! The hub holds the last published summary, so every read is served
//! from memory without touching the ingestion side.
//!
//! [`Hub`]: hub::Hub

pub mod error;
pub mod handlers;
pub mod hub;
pub mod router;
pub mod server;
pub mod sse;
pub mod startup;
pub mod state;

// Re-export primary types for convenience.
pub use hub::{Hub, PoolKind, Subscription};
pub use router::build_router;
pub use server::ServerError;
pub use state::AppState;
