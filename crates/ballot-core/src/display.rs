//! Human-readable rendering of a summary.
//!
//! Percentages are derived here and nowhere else, using exact decimal
//! arithmetic so shares of a national total round predictably. Stored and
//! transmitted summaries carry integer counts only.

use std::fmt::Write as _;

use ballot_types::Summary;
use rust_decimal::{Decimal, RoundingStrategy};

/// Share of `part` in `whole` as a percentage rounded to two places.
///
/// Returns zero when `whole` is zero.
pub fn percent(part: u64, whole: u64) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(part)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.checked_div(Decimal::from(whole)))
        .map_or(Decimal::ZERO, |share| {
            share.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        })
}

/// Render a summary as a fixed-width table with a national footer.
pub fn render(summary: &Summary) -> String {
    let width = summary
        .regions
        .iter()
        .map(|r| r.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("national".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$}  {:>10} {:>7}  {:>10} {:>7}  {:>9}",
        "region", "A", "%", "B", "%", "invalid"
    );
    for region in &summary.regions {
        let _ = writeln!(
            out,
            "{:<width$}  {:>10} {:>7}  {:>10} {:>7}  {:>9}",
            region.name,
            region.count_a,
            percent(region.count_a, region.total),
            region.count_b,
            percent(region.count_b, region.total),
            region.invalid,
        );
    }
    let _ = write!(
        out,
        "{:<width$}  {:>10} {:>7}  {:>10} {:>7}  {:>9}",
        "national",
        summary.total_a,
        percent(summary.total_a, summary.total_votes),
        summary.total_b,
        percent(summary.total_b, summary.total_votes),
        summary.total_invalid,
    );
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::str::FromStr;

    use ballot_types::RegionSummary;
    use chrono::Utc;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap_or_default()
    }

    #[test]
    fn percent_rounds_half_away_from_zero() {
        assert_eq!(percent(1, 8), dec("12.50"));
        assert_eq!(percent(1, 3), dec("33.33"));
        assert_eq!(percent(2, 3), dec("66.67"));
        assert_eq!(percent(17, 52), dec("32.69"));
    }

    #[test]
    fn percent_of_zero_total_is_zero() {
        assert_eq!(percent(0, 0), Decimal::ZERO);
        assert_eq!(percent(5, 0), Decimal::ZERO);
    }

    #[test]
    fn render_lists_regions_then_national_line() {
        let mut abroad = RegionSummary::new("abroad".to_owned());
        abroad.record(5, 10, 20);
        let mut maz = RegionSummary::new("Mazowieckie".to_owned());
        maz.record(3, 7, 15);
        let summary = Summary::from_regions(1, vec![abroad, maz], Utc::now());

        let text = render(&summary);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("abroad"));
        assert!(lines[2].starts_with("Mazowieckie"));
        assert!(lines[3].starts_with("national"));
        assert!(lines[3].contains("32.69"));
        assert!(lines[3].contains("67.31"));
    }
}
