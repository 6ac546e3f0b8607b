//! Aggregation of the per-station report into a [`Summary`].
//!
//! The report is a delimiter-separated text file with one row per polling
//! station and a header line. Each row contributes its invalid-ballot
//! count and both candidates' votes to its region and to the national
//! totals.
//!
//! Malformed input never aborts a pass:
//!
//! - rows with too few fields are skipped and logged,
//! - unparsable numeric fields count as zero,
//! - a blank region label is attributed to the abroad bucket.
//!
//! All arithmetic is on `u64`; nothing in the counting path touches
//! floating point.

use std::collections::BTreeMap;

use ballot_types::{RegionSummary, Summary};
use chrono::{DateTime, Utc};
use csv::StringRecord;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::collate;

/// Byte-order marker some publishers prepend to UTF-8 text.
const BOM: char = '\u{feff}';

/// Column positions inside one report row.
///
/// Defaults match the per-station protocol export: region in column 5
/// (`F`), invalid ballots in column 25 (`Z`), the two candidates in
/// columns 29 and 30 (`AD`, `AE`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReportLayout {
    /// Field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Zero-based index of the region label.
    #[serde(default = "default_region_column")]
    pub region_column: usize,

    /// Zero-based index of the invalid-ballot count.
    #[serde(default = "default_invalid_column")]
    pub invalid_column: usize,

    /// Zero-based index of candidate A's votes.
    #[serde(default = "default_count_a_column")]
    pub count_a_column: usize,

    /// Zero-based index of candidate B's votes.
    #[serde(default = "default_count_b_column")]
    pub count_b_column: usize,

    /// Rows with fewer fields are skipped.
    #[serde(default = "default_min_fields")]
    pub min_fields: usize,

    /// Region name used for rows with a blank region label.
    #[serde(default = "default_abroad_label")]
    pub abroad_label: String,
}

impl ReportLayout {
    /// Whether `min_fields` guarantees every configured column exists.
    pub fn covers_columns(&self) -> bool {
        [
            self.region_column,
            self.invalid_column,
            self.count_a_column,
            self.count_b_column,
        ]
        .iter()
        .all(|&col| col < self.min_fields)
    }
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            region_column: default_region_column(),
            invalid_column: default_invalid_column(),
            count_a_column: default_count_a_column(),
            count_b_column: default_count_b_column(),
            min_fields: default_min_fields(),
            abroad_label: default_abroad_label(),
        }
    }
}

const fn default_delimiter() -> char {
    ';'
}

const fn default_region_column() -> usize {
    5
}

const fn default_invalid_column() -> usize {
    25
}

const fn default_count_a_column() -> usize {
    29
}

const fn default_count_b_column() -> usize {
    30
}

const fn default_min_fields() -> usize {
    31
}

fn default_abroad_label() -> String {
    "abroad".to_owned()
}

/// One parsed report row, borrowed from the underlying record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow<'a> {
    /// Region label exactly as published (may be blank).
    pub region: &'a str,
    /// Invalid ballots.
    pub invalid: u64,
    /// Votes for candidate A.
    pub count_a: u64,
    /// Votes for candidate B.
    pub count_b: u64,
}

impl<'a> RawRow<'a> {
    /// Extract the counted columns from a record.
    ///
    /// Returns `None` when the record has fewer than `layout.min_fields`
    /// fields.
    pub fn from_record(record: &'a StringRecord, layout: &ReportLayout) -> Option<Self> {
        if record.len() < layout.min_fields {
            return None;
        }
        let field = move |idx: usize| record.get(idx).unwrap_or("");
        Some(Self {
            region: field(layout.region_column),
            invalid: parse_count(field(layout.invalid_column)),
            count_a: parse_count(field(layout.count_a_column)),
            count_b: parse_count(field(layout.count_b_column)),
        })
    }
}

/// Result of one aggregation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    /// The complete snapshot.
    pub summary: Summary,
    /// Data rows that contributed to the snapshot.
    pub rows: usize,
    /// Data rows that were skipped as malformed.
    pub skipped_rows: usize,
}

/// Aggregate report text into a [`Summary`].
///
/// The first line is a header and is discarded. A single leading
/// byte-order marker is stripped. Quoted fields may contain the
/// delimiter.
pub fn aggregate(
    content: &str,
    timestamp: i64,
    layout: &ReportLayout,
    generated_at: DateTime<Utc>,
) -> Aggregation {
    let content = content.strip_prefix(BOM).unwrap_or(content);
    let delimiter = u8::try_from(layout.delimiter).unwrap_or(b';');

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .quote(b'"')
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut regions: BTreeMap<String, RegionSummary> = BTreeMap::new();
    let mut rows: usize = 0;
    let mut skipped_rows: usize = 0;

    for (index, result) in reader.records().enumerate() {
        // Header is line 1, so data row `index` sits on line `index + 2`.
        let line = index.saturating_add(2);
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!(line, error = %e, "Skipping unreadable report row");
                skipped_rows = skipped_rows.saturating_add(1);
                continue;
            }
        };

        let Some(row) = RawRow::from_record(&record, layout) else {
            warn!(
                line,
                fields = record.len(),
                required = layout.min_fields,
                "Skipping incomplete report row"
            );
            skipped_rows = skipped_rows.saturating_add(1);
            continue;
        };

        let name = region_name(row.region, layout);
        regions
            .entry(name.to_owned())
            .or_insert_with(|| RegionSummary::new(name.to_owned()))
            .record(row.invalid, row.count_a, row.count_b);
        rows = rows.saturating_add(1);
    }

    let mut ordered: Vec<RegionSummary> = regions.into_values().collect();
    ordered.sort_by(|a, b| collate::compare(&a.name, &b.name));

    debug!(rows, skipped_rows, regions = ordered.len(), "Report aggregated");

    Aggregation {
        summary: Summary::from_regions(timestamp, ordered, generated_at),
        rows,
        skipped_rows,
    }
}

/// Map a published region label to its bucket name.
fn region_name<'a>(label: &'a str, layout: &'a ReportLayout) -> &'a str {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        &layout.abroad_label
    } else {
        trimmed
    }
}

/// Parse a vote count, tolerating locale formatting.
///
/// Leading and trailing whitespace is ignored, digit-group separators
/// (space, no-break space, narrow no-break space, apostrophe, underscore)
/// are skipped, and parsing stops at the first other character, so
/// `"1 234"` is 1234 and `"12,0"` is 12. Anything without leading digits,
/// negative values and values that overflow `u64` count as zero.
pub fn parse_count(field: &str) -> u64 {
    let trimmed = field.trim_matches(|c: char| c.is_whitespace() || c == '"');
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let mut value: u64 = 0;
    let mut seen_digit = false;
    for c in digits.chars() {
        if let Some(d) = c.to_digit(10) {
            let Some(next) = value.checked_mul(10).and_then(|v| v.checked_add(u64::from(d)))
            else {
                return 0;
            };
            value = next;
            seen_digit = true;
        } else if !(seen_digit && is_group_separator(c)) {
            break;
        }
    }
    value
}

const fn is_group_separator(c: char) -> bool {
    matches!(c, ' ' | '\u{a0}' | '\u{202f}' | '\'' | '_')
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    /// Four-column layout: region, invalid, A, B.
    fn compact() -> ReportLayout {
        ReportLayout {
            delimiter: ';',
            region_column: 0,
            invalid_column: 1,
            count_a_column: 2,
            count_b_column: 3,
            min_fields: 4,
            abroad_label: "abroad".to_owned(),
        }
    }

    fn run(content: &str) -> Aggregation {
        aggregate(content, 1_748_821_425, &compact(), Utc::now())
    }

    #[test]
    fn aggregates_example_rows() {
        let out = run("region;invalid;a;b\n;\"5\";\"10\";\"20\"\nMazowieckie;\"3\";\"7\";\"15\"\n");
        let s = &out.summary;

        assert_eq!(s.timestamp, 1_748_821_425);
        assert_eq!(s.total_a, 17);
        assert_eq!(s.total_b, 35);
        assert_eq!(s.total_invalid, 8);
        assert_eq!(s.total_votes, 52);

        let names: Vec<&str> = s.regions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["abroad", "Mazowieckie"]);

        let maz = s.region("Mazowieckie").map(|r| (r.count_a, r.count_b, r.invalid, r.total));
        assert_eq!(maz, Some((7, 15, 3, 22)));
        let abroad = s.region("abroad").map(|r| (r.count_a, r.count_b, r.invalid, r.total));
        assert_eq!(abroad, Some((10, 20, 5, 30)));
        assert!(s.is_consistent());
    }

    #[test]
    fn header_only_report_is_empty() {
        let out = run("region;invalid;a;b\n");
        assert_eq!(out.rows, 0);
        assert!(out.summary.regions.is_empty());
        assert_eq!(out.summary.total_votes, 0);
    }

    #[test]
    fn strips_leading_bom_once() {
        let out = run("\u{feff}region;invalid;a;b\nx;0;1;1\n");
        assert_eq!(out.rows, 1);
        assert_eq!(out.summary.regions[0].name, "x");
    }

    #[test]
    fn short_rows_are_skipped_not_fatal() {
        let out = run("h1;h2;h3;h4\nx;1;2;3\nbroken;1\ny;0;4;5\n");
        assert_eq!(out.rows, 2);
        assert_eq!(out.skipped_rows, 1);
        assert_eq!(out.summary.total_a, 6);
        assert_eq!(out.summary.total_b, 8);
    }

    #[test]
    fn unparsable_numbers_count_as_zero() {
        let out = run("h1;h2;h3;h4\nx;abc;7;\nx;1;n/a;2\n");
        assert_eq!(out.skipped_rows, 0);
        let x = out.summary.region("x").map(|r| (r.invalid, r.count_a, r.count_b));
        assert_eq!(x, Some((1, 7, 2)));
    }

    #[test]
    fn blank_labels_merge_into_one_abroad_bucket() {
        let out = run("h1;h2;h3;h4\n;0;1;1\n   ;0;2;2\n\"\";0;3;3\n");
        assert_eq!(out.summary.regions.len(), 1);
        assert_eq!(out.summary.regions[0].name, "abroad");
        assert_eq!(out.summary.regions[0].total, 12);
    }

    #[test]
    fn region_labels_are_case_sensitive() {
        let out = run("h1;h2;h3;h4\nopolskie;0;1;1\nOpolskie;0;1;1\n");
        assert_eq!(out.summary.regions.len(), 2);
    }

    #[test]
    fn quoted_fields_may_contain_delimiter() {
        let out = run("h1;h2;h3;h4\n\"Komisja; nr 1\";0;1;1\n");
        assert_eq!(out.summary.regions[0].name, "Komisja; nr 1");
    }

    #[test]
    fn same_input_yields_same_content() {
        let content = "h1;h2;h3;h4\nb;1;2;3\na;4;5;6\n;7;8;9\n";
        let first = run(content).summary;
        let second = run(content).summary;
        assert!(first.same_content(&second));
    }

    #[test]
    fn default_layout_reads_wide_rows() {
        let mut fields = vec!["0"; 31];
        fields[5] = "pomorskie";
        fields[25] = "2";
        fields[29] = "100";
        fields[30] = "200";
        let header = vec!["h"; 31].join(";");
        let content = format!("{header}\n{}\n", fields.join(";"));

        let out = aggregate(&content, 1, &ReportLayout::default(), Utc::now());
        let p = out.summary.region("pomorskie").map(|r| (r.invalid, r.count_a, r.count_b));
        assert_eq!(p, Some((2, 100, 200)));
    }

    #[test]
    fn parse_count_tolerates_locale_formatting() {
        assert_eq!(parse_count("42"), 42);
        assert_eq!(parse_count("  42 "), 42);
        assert_eq!(parse_count("1 234"), 1234);
        assert_eq!(parse_count("1\u{a0}234"), 1234);
        assert_eq!(parse_count("1'234_567"), 1_234_567);
        assert_eq!(parse_count(" 1"), 1);
        assert_eq!(parse_count("_1"), 0);
        assert_eq!(parse_count("+7"), 7);
        assert_eq!(parse_count("12,5"), 12);
        assert_eq!(parse_count("-3"), 0);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("x1"), 0);
        assert_eq!(parse_count("99999999999999999999999"), 0);
    }

    #[test]
    fn layout_coverage_check() {
        assert!(ReportLayout::default().covers_columns());
        let mut layout = compact();
        layout.min_fields = 3;
        assert!(!layout.covers_columns());
    }

    mod laws {
        use std::cmp::Ordering;

        use proptest::prelude::*;

        use super::*;

        fn label() -> impl Strategy<Value = String> {
            prop_oneof![
                Just(String::new()),
                Just("   ".to_owned()),
                Just("Mazowieckie".to_owned()),
                Just("łódzkie".to_owned()),
                Just("Łódzkie".to_owned()),
                "[a-zA-Z]{1,8}",
            ]
        }

        fn count() -> impl Strategy<Value = String> {
            prop_oneof![
                "[0-9]{1,6}",
                Just(String::new()),
                "[a-z]{1,3}",
                "[0-9]{1,3} [0-9]{3}",
            ]
        }

        fn rows() -> impl Strategy<Value = Vec<(String, String, String, String)>> {
            prop::collection::vec((label(), count(), count(), count()), 0..40)
        }

        fn render(rows: &[(String, String, String, String)]) -> String {
            let mut content = String::from("region;invalid;a;b\n");
            for (region, invalid, a, b) in rows {
                content.push_str(&format!("{region};{invalid};{a};{b}\n"));
            }
            content
        }

        proptest! {
            #[test]
            fn totals_are_the_sum_of_every_row(rows in rows()) {
                let out = run(&render(&rows));
                let s = &out.summary;

                prop_assert_eq!(out.rows, rows.len());
                prop_assert_eq!(out.skipped_rows, 0);
                prop_assert!(s.is_consistent());

                let invalid: u64 = rows.iter().map(|r| parse_count(&r.1)).sum();
                let a: u64 = rows.iter().map(|r| parse_count(&r.2)).sum();
                let b: u64 = rows.iter().map(|r| parse_count(&r.3)).sum();
                prop_assert_eq!(s.total_invalid, invalid);
                prop_assert_eq!(s.total_a, a);
                prop_assert_eq!(s.total_b, b);
                prop_assert_eq!(s.total_votes, a + b);
            }

            #[test]
            fn regions_are_unique_trimmed_and_ordered(rows in rows()) {
                let s = run(&render(&rows)).summary;

                for pair in s.regions.windows(2) {
                    prop_assert_eq!(
                        collate::compare(&pair[0].name, &pair[1].name),
                        Ordering::Less
                    );
                }
                for region in &s.regions {
                    prop_assert!(!region.name.is_empty());
                    prop_assert_eq!(region.name.trim(), region.name.as_str());
                }

                let abroad = rows.iter().any(|r| r.0.trim().is_empty() || r.0 == "abroad");
                prop_assert_eq!(s.region("abroad").is_some(), abroad);
            }

            #[test]
            fn aggregation_is_deterministic(rows in rows()) {
                let content = render(&rows);
                let first = run(&content).summary;
                let second = run(&content).summary;
                prop_assert!(first.same_content(&second));
            }
        }
    }
}
