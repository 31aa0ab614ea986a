use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::SearchError;

pub type ApiResult<T> = Result<T, ApiError>;

/// HTTP-facing error wrapper.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("Not found")]
    NotFound,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            // Input/Decode are the caller's fault; everything else in the
            // pipeline is server-side.
            ApiError::Search(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Search(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::Search(SearchError::Input(_)) => "INVALID_INPUT",
            ApiError::Search(SearchError::Decode(_)) => "IMAGE_DECODE_FAILED",
            ApiError::Search(SearchError::Capability(_)) => "CAPABILITY_ERROR",
            ApiError::Search(SearchError::IndexLoad(_)) => "INDEX_ERROR",
            ApiError::Search(SearchError::DimensionMismatch { .. }) => "DIMENSION_MISMATCH",
            ApiError::Search(SearchError::Io(_)) => "IO_ERROR",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}
