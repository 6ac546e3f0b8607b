//! Aggregated result snapshots.
//!
//! A [`Summary`] is the unit that flows through the whole system: the
//! aggregator builds it, the tracker holds it, the store persists it and
//! the hub serializes it to subscribers. It is never mutated after
//! construction; a newer report produces a brand-new value.
//!
//! All counters are integers. Percentages exist only in display code and
//! are derived after summation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// RegionSummary
// ---------------------------------------------------------------------------

/// Vote totals for a single region.
///
/// Invariant: `total == count_a + count_b`. Invalid ballots are tracked
/// separately and never included in `total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct RegionSummary {
    /// Region label as published, or the abroad sentinel.
    pub name: String,
    /// Votes for candidate A.
    #[ts(type = "number")]
    pub count_a: u64,
    /// Votes for candidate B.
    #[ts(type = "number")]
    pub count_b: u64,
    /// Invalid ballots.
    #[ts(type = "number")]
    pub invalid: u64,
    /// Valid votes cast for either candidate.
    #[ts(type = "number")]
    pub total: u64,
}

impl RegionSummary {
    /// Create an empty region accumulator.
    pub const fn new(name: String) -> Self {
        Self {
            name,
            count_a: 0,
            count_b: 0,
            invalid: 0,
            total: 0,
        }
    }

    /// Add one polling-station row to this region.
    pub const fn record(&mut self, invalid: u64, count_a: u64, count_b: u64) {
        self.count_a = self.count_a.saturating_add(count_a);
        self.count_b = self.count_b.saturating_add(count_b);
        self.invalid = self.invalid.saturating_add(invalid);
        self.total = self.count_a.saturating_add(self.count_b);
    }

    /// Whether the derived `total` matches the candidate counts.
    pub const fn is_consistent(&self) -> bool {
        matches!(self.count_a.checked_add(self.count_b), Some(total) if total == self.total)
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// National snapshot built from one published report.
///
/// `timestamp` is the publisher's artifact version and the only key used
/// to decide whether a newer snapshot supersedes an older one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Summary {
    /// Publisher's artifact timestamp.
    #[ts(type = "number")]
    pub timestamp: i64,
    /// National votes for candidate A.
    #[ts(type = "number")]
    pub total_a: u64,
    /// National votes for candidate B.
    #[ts(type = "number")]
    pub total_b: u64,
    /// National invalid ballots.
    #[ts(type = "number")]
    pub total_invalid: u64,
    /// `total_a + total_b`.
    #[ts(type = "number")]
    pub total_votes: u64,
    /// Per-region totals, ordered by name.
    pub regions: Vec<RegionSummary>,
    /// Wall-clock time at which this snapshot was built.
    pub generated_at: DateTime<Utc>,
}

impl Summary {
    /// Build a summary from already-ordered regions.
    ///
    /// National totals are summed from the regions so the two can never
    /// disagree.
    pub fn from_regions(
        timestamp: i64,
        regions: Vec<RegionSummary>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let (total_a, total_b, total_invalid) =
            regions.iter().fold((0u64, 0u64, 0u64), |(a, b, inv), r| {
                (
                    a.saturating_add(r.count_a),
                    b.saturating_add(r.count_b),
                    inv.saturating_add(r.invalid),
                )
            });

        Self {
            timestamp,
            total_a,
            total_b,
            total_invalid,
            total_votes: total_a.saturating_add(total_b),
            regions,
            generated_at,
        }
    }

    /// Look up a region by exact name.
    pub fn region(&self, name: &str) -> Option<&RegionSummary> {
        self.regions.iter().find(|r| r.name == name)
    }

    /// Check every counting invariant.
    ///
    /// Used to reject persisted documents that were edited or truncated.
    pub fn is_consistent(&self) -> bool {
        let mut a = 0u64;
        let mut b = 0u64;
        let mut inv = 0u64;
        for region in &self.regions {
            if !region.is_consistent() {
                return false;
            }
            a = a.saturating_add(region.count_a);
            b = b.saturating_add(region.count_b);
            inv = inv.saturating_add(region.invalid);
        }
        a == self.total_a
            && b == self.total_b
            && inv == self.total_invalid
            && self.total_a.checked_add(self.total_b) == Some(self.total_votes)
    }

    /// Compare two summaries ignoring `generated_at`.
    pub fn same_content(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
            && self.total_a == other.total_a
            && self.total_b == other.total_b
            && self.total_invalid == other.total_invalid
            && self.total_votes == other.total_votes
            && self.regions == other.regions
    }
}
