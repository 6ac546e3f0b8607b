//! HTTP access to the publisher and archive extraction.
//!
//! [`Publisher`] performs the two downloads of a pass: the configuration
//! index and the versioned archive. Neither call retries; a failed pass
//! is simply repeated on the next tick.

use std::io::{Cursor, Read};

use tracing::{debug, warn};

use crate::error::TrackerError;

/// HTTP client bound to one publisher.
#[derive(Debug, Clone)]
pub struct Publisher {
    client: reqwest::Client,
}

impl Publisher {
    /// Create a publisher client with a fresh connection pool.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Download the raw configuration index.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ConfigFetch`] on transport failure or a
    /// non-success status.
    pub async fn fetch_config(&self, url: &str) -> Result<Vec<u8>, TrackerError> {
        let bytes = self.get(url).await.map_err(TrackerError::ConfigFetch)?;
        debug!(url, size = bytes.len(), "Configuration index downloaded");
        Ok(bytes)
    }

    /// Download an archive and extract one member as text.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ArchiveFetch`] if the download fails, or an
    /// extraction error from [`extract_member`].
    pub async fn fetch_report(&self, url: &str, member: &str) -> Result<String, TrackerError> {
        debug!(url, "Downloading archive");
        let bytes = self.get(url).await.map_err(TrackerError::ArchiveFetch)?;
        debug!(size = bytes.len(), "Archive downloaded");

        let text = extract_member(&bytes, member)?;
        debug!(member, chars = text.len(), "Report extracted");
        Ok(text)
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request to {url} failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("{url} returned {status}"));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| format!("reading body of {url} failed: {e}"))?;
        Ok(body.to_vec())
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract a named member of an in-memory zip archive as text.
///
/// Invalid UTF-8 sequences are replaced with `U+FFFD` rather than failing
/// the pass; only the affected labels are garbled.
///
/// # Errors
///
/// Returns [`TrackerError::ArchiveMemberMissing`] if no member has that
/// exact name, or [`TrackerError::ArchiveCorrupt`] if the archive or the
/// member cannot be decompressed.
pub fn extract_member(archive: &[u8], member: &str) -> Result<String, TrackerError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| TrackerError::ArchiveCorrupt(e.to_string()))?;

    let mut file = match zip.by_name(member) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(TrackerError::ArchiveMemberMissing {
                member: member.to_owned(),
            });
        }
        Err(e) => return Err(TrackerError::ArchiveCorrupt(e.to_string())),
    };

    let mut raw = Vec::new();
    file.read_to_end(&mut raw)
        .map_err(|e| TrackerError::ArchiveCorrupt(format!("{member}: {e}")))?;

    match String::from_utf8(raw) {
        Ok(text) => Ok(text),
        Err(e) => {
            let valid_up_to = e.utf8_error().valid_up_to();
            warn!(member, valid_up_to, "Report is not valid UTF-8, replacing bad sequences");
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}
