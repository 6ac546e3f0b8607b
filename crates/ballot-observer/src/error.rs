//! Error types for the HTTP layer.
//!
//! [`ObserverError`] converts into an axum response whose body is a JSON
//! object `{ "error": <message>, "status": <code> }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors returned by request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested resource does not exist yet.
    #[error("{0}")]
    NotFound(String),
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
