use std::time::Duration;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::spam::SpamRejection;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Message too long (max {max} characters)")]
    MessageTooLong { max: usize },

    #[error("Pseudo too long (max {max} characters)")]
    PseudoTooLong { max: usize },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Invalid message id")]
    InvalidId,

    #[error("Message not found")]
    NotFound,

    #[error("Not found")]
    RouteNotFound,

    #[error("Too many requests, retry after {}s", .retry_after.as_secs().max(1))]
    RateLimited { retry_after: Duration },

    #[error("{0}")]
    Spam(SpamRejection),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::EmptyMessage
            | AppError::MessageTooLong { .. }
            | AppError::PseudoTooLong { .. }
            | AppError::MalformedPayload(_)
            | AppError::InvalidId => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound | AppError::RouteNotFound => StatusCode::NOT_FOUND,
            AppError::RateLimited { .. } | AppError::Spam(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(e) = &self {
            error!("Internal error: {e:#}\n{}", e.backtrace());
        }

        let status = self.status();
        let mut response = (
            status,
            Json(json!({
                "code": 0,
                "error": self.to_string(),
            })),
        )
            .into_response();

        if let AppError::RateLimited { retry_after } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}
