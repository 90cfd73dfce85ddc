use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::generation::GenerationError;
use crate::upstream::LookupError;

/// Everything a handler can fail with, rendered as `{ error, details }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Upstream(#[from] LookupError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    details: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Generation(GenerationError::InvalidMood) => StatusCode::BAD_REQUEST,
            ApiError::Generation(GenerationError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Generation(_) => StatusCode::BAD_GATEWAY,
            ApiError::Upstream(LookupError::NotConfigured(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(LookupError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "Invalid request",
            ApiError::Generation(GenerationError::InvalidMood) => "Invalid mood",
            ApiError::Generation(GenerationError::RateLimited) => "Rate limited",
            ApiError::Generation(_) => "Failed to generate playlist",
            ApiError::Upstream(_) => "Upstream request failed",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}: {}", self.label(), self);
        } else {
            warn!("{}: {}", self.label(), self);
        }
        let body = ErrorBody {
            error: self.label(),
            details: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
