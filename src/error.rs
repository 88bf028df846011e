use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::vision::IdentifyError;

/// Top-level error surface for handlers. Identification failures keep
/// their original message end to end; the client displays it verbatim.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("image upload failed: {0}")]
    Storage(#[source] anyhow::Error),
    #[error(transparent)]
    Identify(#[from] IdentifyError),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    retryable: bool,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Identify(e) => match e {
                IdentifyError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                IdentifyError::QuotaExhausted => StatusCode::PAYMENT_REQUIRED,
                IdentifyError::InvalidImage(_) => StatusCode::BAD_REQUEST,
                IdentifyError::Upstream(_)
                | IdentifyError::EmptyResponse
                | IdentifyError::MalformedResponse => StatusCode::BAD_GATEWAY,
            },
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            AppError::Identify(e) => e.is_retryable(),
            AppError::Storage(_) => true,
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
            retryable: self.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify_errors_map_to_expected_statuses() {
        assert_eq!(
            AppError::from(IdentifyError::RateLimited).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::from(IdentifyError::QuotaExhausted).status(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            AppError::from(IdentifyError::MalformedResponse).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(IdentifyError::InvalidImage("empty")).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn retryable_marking_by_error_kind() {
        assert!(AppError::from(IdentifyError::RateLimited).is_retryable());
        assert!(AppError::from(IdentifyError::EmptyResponse).is_retryable());
        assert!(AppError::Storage(anyhow::anyhow!("s3 down")).is_retryable());
        assert!(!AppError::from(IdentifyError::QuotaExhausted).is_retryable());
        assert!(!AppError::from(IdentifyError::MalformedResponse).is_retryable());
        assert!(!AppError::Validation("bad goal".into()).is_retryable());
        assert!(!AppError::NotFound("meal").is_retryable());
    }

    #[test]
    fn identification_message_survives_unchanged() {
        let err = AppError::from(IdentifyError::RateLimited);
        assert_eq!(
            err.to_string(),
            "AI service rate limit exceeded. Please try again later."
        );
    }
}
