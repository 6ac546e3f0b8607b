//! Supersession rule for summaries.
//!
//! The publisher's timestamp is the only "new data" signal. Two
//! summaries with the same timestamp are the same version even when their
//! computed totals differ, so re-aggregating identical bytes is a no-op.

use ballot_types::Summary;

/// Whether a resolved artifact timestamp differs from the held summary.
pub fn is_new_version(previous: Option<&Summary>, timestamp: i64) -> bool {
    previous.is_none_or(|held| held.timestamp != timestamp)
}

/// Whether `candidate` should replace `previous`.
///
/// Accepts when nothing is held or the timestamps differ; rejects equal
/// timestamps unconditionally.
pub fn should_accept(previous: Option<&Summary>, candidate: &Summary) -> bool {
    is_new_version(previous, candidate.timestamp)
}
