//! Request/response endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | HTML status page with cache validation |
//! | `GET` | `/api/elections/current` | Current summary as JSON |
//! | `GET` | `/api/health` | Liveness and data availability |

use std::fmt::Write as _;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use ballot_core::display::percent;
use ballot_types::{ServerEpoch, Summary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET / -- status page
// ---------------------------------------------------------------------------

/// Serve the status page.
///
/// The response carries an `ETag` derived from the summary's volatile
/// fields. A request whose `If-None-Match` matches gets `304 Not Modified`
/// with no body.
pub async fn index(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let summary = state.current();
    let etag = format!("\"{}\"", fingerprint(state.hub.epoch(), summary.as_deref()));

    let not_modified = headers
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| etag_matches(v, &etag));
    if not_modified {
        return (StatusCode::NOT_MODIFIED, [(ETAG, etag)]).into_response();
    }

    let page = render_page(state.hub.epoch(), summary.as_deref());
    (
        [(ETAG, etag), (CACHE_CONTROL, "no-cache".to_owned())],
        Html(page),
    )
        .into_response()
}

/// Hex SHA-256 over the epoch and the summary fields that change between
/// versions.
pub fn fingerprint(epoch: ServerEpoch, summary: Option<&Summary>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(epoch.to_string().as_bytes());
    if let Some(s) = summary {
        hasher.update(
            format!(
                "|{}|{}|{}|{}|{}|{}",
                s.timestamp,
                s.total_a,
                s.total_b,
                s.total_invalid,
                s.regions.len(),
                s.generated_at.to_rfc3339()
            )
            .as_bytes(),
        );
    }
    hex::encode(hasher.finalize())
}

/// Whether an `If-None-Match` value names `etag` (weak tags match too).
fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    if_none_match
        .split(',')
        .map(str::trim)
        .any(|tag| tag == "*" || tag.trim_start_matches("W/") == etag)
}

fn render_page(epoch: ServerEpoch, summary: Option<&Summary>) -> String {
    let body = summary.map_or_else(
        || "<p class=\"subtitle\">Waiting for the first published report...</p>".to_owned(),
        render_summary,
    );

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Ballot Tracker</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 900px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 140px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        table {{ border-collapse: collapse; width: 100%; }}
        th, td {{ border-bottom: 1px solid #30363d; padding: 0.3rem 0.6rem; text-align: right; }}
        th:first-child, td:first-child {{ text-align: left; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li::before {{ content: "GET "; color: #7ee787; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Ballot Tracker</h1>
    <p class="subtitle">Server version {epoch}</p>
{body}
    <hr>
    <ul>
        <li><a href="/api/elections/current">/api/elections/current</a></li>
        <li><a href="/api/elections/stream2">/api/elections/stream2</a></li>
        <li><a href="/api/elections/stream">/api/elections/stream</a></li>
        <li><a href="/api/health">/api/health</a></li>
    </ul>
</body>
</html>"#
    )
}

fn render_summary(summary: &Summary) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        r#"    <div>
        <div class="metric"><div class="label">Candidate A</div><div class="value">{a} ({pa}%)</div></div>
        <div class="metric"><div class="label">Candidate B</div><div class="value">{b} ({pb}%)</div></div>
        <div class="metric"><div class="label">Invalid</div><div class="value">{inv}</div></div>
        <div class="metric"><div class="label">Report</div><div class="value">{ts}</div></div>
    </div>
    <table>
        <tr><th>Region</th><th>A</th><th>%</th><th>B</th><th>%</th><th>Invalid</th></tr>
"#,
        a = summary.total_a,
        pa = percent(summary.total_a, summary.total_votes),
        b = summary.total_b,
        pb = percent(summary.total_b, summary.total_votes),
        inv = summary.total_invalid,
        ts = summary.timestamp,
    );
    for region in &summary.regions {
        let _ = writeln!(
            out,
            "        <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&region.name),
            region.count_a,
            percent(region.count_a, region.total),
            region.count_b,
            percent(region.count_b, region.total),
            region.invalid,
        );
    }
    out.push_str("    </table>");
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// GET /api/elections/current
// ---------------------------------------------------------------------------

/// Return the current summary, or 404 before the first accepted report.
///
/// # Errors
///
/// Returns [`ObserverError::NotFound`] when no summary is held.
pub async fn current(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Summary>, ObserverError> {
    state
        .current()
        .map(|s| Json((*s).clone()))
        .ok_or_else(|| ObserverError::NotFound("No election data available".to_owned()))
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

/// Liveness response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: &'static str,
    /// Time of the response.
    pub timestamp: DateTime<Utc>,
    /// Whether a summary is held.
    pub has_data: bool,
    /// Seconds since the process started serving.
    pub uptime_secs: u64,
}

/// Report liveness and whether data is available.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        has_data: state.current().is_some(),
        uptime_secs: state.uptime_secs(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn etag_matching_handles_lists_weak_tags_and_wildcard() {
        assert!(etag_matches("\"abc\"", "\"abc\""));
        assert!(etag_matches("\"x\", W/\"abc\"", "\"abc\""));
        assert!(etag_matches("*", "\"abc\""));
        assert!(!etag_matches("\"abd\"", "\"abc\""));
    }

    #[test]
    fn fingerprint_tracks_epoch_and_summary() {
        let epoch = ServerEpoch::generate();
        let empty = fingerprint(epoch, None);
        assert_eq!(empty, fingerprint(epoch, None));
        assert_ne!(empty, fingerprint(ServerEpoch::generate(), None));

        let s = Summary::from_regions(5, Vec::new(), Utc::now());
        assert_ne!(empty, fingerprint(epoch, Some(&s)));
        assert_eq!(fingerprint(epoch, Some(&s)).len(), 64);
    }

    #[test]
    fn escape_neutralises_markup() {
        assert_eq!(escape("<b>&\"x\""), "&lt;b&gt;&amp;&quot;x&quot;");
        assert_eq!(escape("łódzkie"), "łódzkie");
    }
}
