//! Ingestion pipeline for published election results.
//!
//! This crate turns the publisher's artifacts into [`Summary`] snapshots
//! and keeps the latest one current:
//!
//! - [`config`] -- Configuration loading from `ballot-config.yaml` with
//!   environment overrides.
//! - [`index`] -- Decoding of the binary configuration index and artifact
//!   resolution.
//! - [`fetch`] -- HTTP downloads and archive extraction.
//! - [`aggregate`] -- Per-region and national totals from report text.
//! - [`collate`] -- Dictionary ordering of region names.
//! - [`change`] -- The rule deciding when a summary supersedes another.
//! - [`store`] -- Single-file JSON persistence of the latest summary.
//! - [`source`] -- [`ReportSource`] trait and the live [`PublisherSource`].
//! - [`tracker`] -- The polling loop that ties it all together.
//! - [`display`] -- Text rendering with percentage shares.
//!
//! [`Summary`]: ballot_types::Summary
//! [`ReportSource`]: source::ReportSource
//! [`PublisherSource`]: source::PublisherSource

pub mod aggregate;
pub mod change;
pub mod collate;
pub mod config;
pub mod display;
pub mod error;
pub mod fetch;
pub mod index;
pub mod source;
pub mod store;
pub mod tracker;
