//! HTTP-facing error type.
//!
//! Every failure a handler can produce maps to a status code and a stable
//! machine-readable error code, so clients can branch on `error.code`
//! without parsing messages.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use histolens_explain::ExplainError;
use histolens_infer::InferError;
use histolens_vision::VisionError;

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors surfaced through the HTTP API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request body or form was malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The submitted image could not be decoded.
    #[error("Image error: {0}")]
    Vision(#[from] VisionError),

    /// Classification or attribution failed.
    #[error("Inference error: {0}")]
    Inference(#[from] InferError),

    /// The server could not start with the given settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    ///
    /// Client mistakes (bad encodings, out-of-range class indices) are 400,
    /// a missing model is 503, everything else is 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) | ApiError::Vision(_) => StatusCode::BAD_REQUEST,
            ApiError::Inference(InferError::ModelNotLoaded) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Inference(InferError::VisionError(_)) => StatusCode::BAD_REQUEST,
            ApiError::Inference(InferError::ExplainError(
                ExplainError::InvalidTargetClass { .. },
            )) => StatusCode::BAD_REQUEST,
            ApiError::Inference(_) | ApiError::Config(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable error code reported in the response body.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::Vision(_) => "IMAGE_DECODE_ERROR",
            ApiError::Inference(InferError::ModelNotLoaded) => "MODEL_NOT_LOADED",
            ApiError::Inference(InferError::VisionError(_)) => "IMAGE_DECODE_ERROR",
            ApiError::Inference(InferError::ExplainError(
                ExplainError::InvalidTargetClass { .. },
            )) => "INVALID_TARGET_CLASS",
            ApiError::Inference(InferError::ExplainError(_)) => "ATTRIBUTION_ERROR",
            ApiError::Inference(_) => "INFERENCE_ERROR",
            ApiError::Config(_) => "CONFIG_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        tracing::error!(code, status = %status, "request failed: {self}");

        let body = Json(json!({
            "success": false,
            "error": {
                "code": code,
                "message": self.to_string(),
            },
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_service_unavailable() {
        let err = ApiError::Inference(InferError::ModelNotLoaded);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), "MODEL_NOT_LOADED");
    }

    #[test]
    fn test_out_of_range_class_is_bad_request() {
        let err = ApiError::Inference(InferError::ExplainError(
            ExplainError::InvalidTargetClass {
                requested: 7,
                num_classes: 2,
            },
        ));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_TARGET_CLASS");
    }

    #[test]
    fn test_malformed_request_is_bad_request() {
        let err = ApiError::InvalidRequest("missing field".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_REQUEST");
    }

    #[test]
    fn test_internal_failures_are_server_errors() {
        let err = ApiError::Internal("task panicked".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_messages_carry_prefix() {
        let err = ApiError::InvalidRequest("image field is empty".to_string());
        assert_eq!(err.to_string(), "Invalid request: image field is empty");
    }
}
