//! Decoding of the publisher's binary configuration index.
//!
//! The publisher ships a protobuf document listing every downloadable
//! artifact, grouped by category, each stamped with the timestamp of its
//! current version. A changed timestamp is the only signal that new data
//! is available.
//!
//! Resolution is an exact two-level lookup: category name, then file
//! name. Either miss yields [`TrackerError::ArtifactNotFound`].

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::TrackerError;

// ---------------------------------------------------------------------------
// Wire schema
// ---------------------------------------------------------------------------

/// Root message of the index blob.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct IndexDocument {
    /// Artifact index.
    #[prost(message, optional, tag = "1")]
    pub index: Option<FileIndex>,
}

/// Artifact listing grouped by category.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct FileIndex {
    /// One entry per category.
    #[prost(message, repeated, tag = "1")]
    pub categorized_files: Vec<Category>,
}

/// A named group of artifacts.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Category {
    /// Category name, e.g. `csv`.
    #[prost(string, tag = "1")]
    pub category_name: String,
    /// Artifacts in this category.
    #[prost(message, optional, tag = "2")]
    pub files: Option<FileList>,
}

/// Container of file entries.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct FileList {
    /// The entries.
    #[prost(message, repeated, tag = "1")]
    pub items: Vec<FileEntry>,
}

/// One published artifact.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct FileEntry {
    /// Stable file name without the version suffix.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Version timestamp of the current upload.
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
}

// ---------------------------------------------------------------------------
// Resolved view
// ---------------------------------------------------------------------------

/// A resolved artifact: its name and current version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    /// File name as listed in the index.
    pub name: String,
    /// Publisher's version timestamp.
    pub timestamp: i64,
}

impl ArtifactEntry {
    /// Build the versioned archive URL: `<base>.<timestamp>.zip`.
    pub fn download_url(&self, base: &str) -> String {
        format!("{base}.{}.zip", self.timestamp)
    }
}

/// Decoded index: category name → file name → timestamp.
///
/// Rebuilt from fresh bytes on every pass and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishedArtifactIndex {
    categories: BTreeMap<String, BTreeMap<String, i64>>,
}

impl PublishedArtifactIndex {
    /// Decode the raw configuration blob.
    ///
    /// When a category or file name is listed twice the first occurrence
    /// wins, matching a front-to-back search of the document.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ConfigDecode`] if the bytes are not a valid
    /// document.
    pub fn decode(bytes: &[u8]) -> Result<Self, TrackerError> {
        let document = <IndexDocument as prost::Message>::decode(bytes)?;
        let index = Self::from_message(document);
        debug!(categories = index.category_count(), "Decoded artifact index");
        Ok(index)
    }

    /// Build the lookup from an already decoded message.
    pub fn from_message(document: IndexDocument) -> Self {
        let mut categories: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
        let listed = document.index.map(|i| i.categorized_files).unwrap_or_default();

        for category in listed {
            let files = categories.entry(category.category_name).or_default();
            for item in category.files.map(|f| f.items).unwrap_or_default() {
                files.entry(item.name).or_insert(item.timestamp);
            }
        }

        Self { categories }
    }

    /// Resolve one artifact by exact category and file name.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ArtifactNotFound`] if either the category
    /// or the file is absent.
    pub fn resolve(&self, category: &str, name: &str) -> Result<ArtifactEntry, TrackerError> {
        self.categories
            .get(category)
            .and_then(|files| files.get(name))
            .map(|&timestamp| ArtifactEntry {
                name: name.to_owned(),
                timestamp,
            })
            .ok_or_else(|| TrackerError::ArtifactNotFound {
                category: category.to_owned(),
                name: name.to_owned(),
            })
    }

    /// Number of listed categories.
    pub fn category_count(&self) -> usize {
        self.categories.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use prost::Message as _;

    use super::*;

    fn entry(name: &str, timestamp: i64) -> FileEntry {
        FileEntry {
            name: name.to_owned(),
            timestamp,
        }
    }

    fn blob(categories: Vec<(&str, Vec<FileEntry>)>) -> Vec<u8> {
        IndexDocument {
            index: Some(FileIndex {
                categorized_files: categories
                    .into_iter()
                    .map(|(name, items)| Category {
                        category_name: name.to_owned(),
                        files: Some(FileList { items }),
                    })
                    .collect(),
            }),
        }
        .encode_to_vec()
    }

    const REPORT: &str = "protokoly_po_obwodach_w_drugiej_turze_csv.zip";

    #[test]
    fn resolves_exact_entry() {
        let bytes = blob(vec![
            ("json", vec![entry(REPORT, 1)]),
            ("csv", vec![entry("other.zip", 2), entry(REPORT, 1_748_821_425)]),
        ]);
        let index = PublishedArtifactIndex::decode(&bytes).unwrap();
        let found = index.resolve("csv", REPORT).unwrap();
        assert_eq!(found.timestamp, 1_748_821_425);
        assert_eq!(index.category_count(), 2);
    }

    #[test]
    fn missing_category_is_not_found() {
        let bytes = blob(vec![("json", vec![entry(REPORT, 1)])]);
        let index = PublishedArtifactIndex::decode(&bytes).unwrap();
        assert!(matches!(
            index.resolve("csv", REPORT),
            Err(TrackerError::ArtifactNotFound { .. })
        ));
    }

    #[test]
    fn missing_file_is_not_found() {
        let bytes = blob(vec![("csv", vec![entry("other.zip", 1)])]);
        let index = PublishedArtifactIndex::decode(&bytes).unwrap();
        assert!(index.resolve("csv", REPORT).is_err());
        // No fuzzy matching on case or suffix.
        assert!(index.resolve("CSV", "other.zip").is_err());
        assert!(index.resolve("csv", "other").is_err());
    }

    #[test]
    fn empty_document_resolves_nothing() {
        let index = PublishedArtifactIndex::decode(&[]).unwrap();
        assert_eq!(index.category_count(), 0);
        assert!(index.resolve("csv", REPORT).is_err());
    }

    #[test]
    fn first_duplicate_wins() {
        let bytes = blob(vec![("csv", vec![entry(REPORT, 10), entry(REPORT, 20)])]);
        let index = PublishedArtifactIndex::decode(&bytes).unwrap();
        assert_eq!(index.resolve("csv", REPORT).unwrap().timestamp, 10);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let result = PublishedArtifactIndex::decode(&[0xff, 0xff, 0xff]);
        assert!(matches!(result, Err(TrackerError::ConfigDecode(_))));
    }

    #[test]
    fn download_url_injects_timestamp() {
        let entry = ArtifactEntry {
            name: REPORT.to_owned(),
            timestamp: 1_748_821_425,
        };
        assert_eq!(
            entry.download_url("https://example.test/data/csv/report"),
            "https://example.test/data/csv/report.1748821425.zip"
        );
    }
}
