use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use waypost_common::error::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("{0}")]
    Validation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("submission file {path} is not a valid JSON array: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("guide not found: {0}")]
    NotFound(String),
}

/// Map errors to HTTP responses.
///
/// Validation problems carry their message to the caller; everything
/// server-side is logged in full and reported with a generic body so
/// internal paths never leak.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(slug) => {
                (StatusCode::NOT_FOUND, format!("guide not found: {slug}"))
            }
            AppError::Common(_) => {
                tracing::error!(error = %self, "feed request failed");
                (StatusCode::BAD_GATEWAY, "Blog feed unavailable".to_string())
            }
            _ => {
                tracing::error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}
