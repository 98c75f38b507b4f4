//! Shared API types

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::data::sqlite::SqliteError;

/// Standard API error response, rendered as `{"error": message}`
#[derive(Debug)]
pub enum ApiError {
    NotFound { message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Storage failures surface as 500 with the underlying message. Reads
    /// are idempotent, so callers are free to retry.
    pub fn from_sqlite(e: SqliteError) -> Self {
        tracing::error!(error = %e, "Storage error");
        Self::Internal {
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound { message } => (StatusCode::NOT_FOUND, message),
            Self::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
