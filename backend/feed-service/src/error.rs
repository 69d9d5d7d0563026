use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::models::FeedItem;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A storage collaborator failed or timed out. Safe to retry.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl AppError {
    /// Stable machine-readable code carried in the response body.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::BadRequest(_) => "bad_request",
            AppError::UpstreamUnavailable(_) => "upstream_unavailable",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::UpstreamUnavailable(_))
    }
}

/// Error body: an empty page plus the error marker.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub items: Vec<FeedItem>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub error: String,
    pub message: String,
    pub retryable: bool,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        // Internal details stay in the logs.
        let message = match self {
            AppError::Unauthenticated(msg) | AppError::BadRequest(msg) => msg.clone(),
            AppError::UpstreamUnavailable(_) => "A backing service is unavailable".to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            items: Vec::new(),
            next_cursor: None,
            has_more: false,
            error: self.error_code().to_string(),
            message,
            retryable: self.is_retryable(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}
