//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::PipelineError;
use crate::report::ReportError;

/// Structured error response body.
///
/// Stage failures additionally carry the failing stage name and its
/// diagnostic so callers can surface which conversion step broke.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Report busy")]
    ReportBusy,
    #[error("Conversion capacity exhausted")]
    Saturated,
    #[error("Generation blocked: {0}")]
    ConsistencyBlocked(String),
    #[error("Conversion stage failed")]
    StageFailed { stage: String, reason: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Seconds a caller should wait before retrying a busy/saturated request.
const RETRY_AFTER_SECS: u64 = 2;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::ReportBusy => (
                StatusCode::TOO_MANY_REQUESTS,
                "REPORT_BUSY",
                "An operation is already in flight for this report".to_string(),
            ),
            ApiError::Saturated => (
                StatusCode::TOO_MANY_REQUESTS,
                "SATURATED",
                format!("Conversion capacity exhausted. Retry after {RETRY_AFTER_SECS}s"),
            ),
            ApiError::ConsistencyBlocked(detail) => (
                StatusCode::CONFLICT,
                "CONSISTENCY_BLOCKED",
                detail.clone(),
            ),
            ApiError::StageFailed { stage, reason } => (
                StatusCode::BAD_GATEWAY,
                "STAGE_FAILED",
                format!("{stage} failed: {reason}"),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let (stage, reason) = match &self {
            ApiError::StageFailed { stage, reason } => {
                (Some(stage.clone()), Some(reason.clone()))
            }
            _ => (None, None),
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
            stage,
            reason,
        };

        let mut response = (status, Json(body)).into_response();
        // Retryable rejections advertise a retry window
        if matches!(self, ApiError::ReportBusy | ApiError::Saturated) {
            if let Ok(val) = axum::http::HeaderValue::from_str(&RETRY_AFTER_SECS.to_string()) {
                response.headers_mut().insert("Retry-After", val);
            }
        }
        response
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Validation(detail) => ApiError::BadRequest(detail),
            ReportError::NotFound(id) => ApiError::NotFound(format!("report {id} not found")),
            ReportError::Busy(_) => ApiError::ReportBusy,
            ReportError::ConsistencyBlocked { state } => ApiError::ConsistencyBlocked(format!(
                "generation requires a Good consistency status, report is {state:?}"
            )),
            ReportError::Pipeline(PipelineError::Saturated) => ApiError::Saturated,
            ReportError::Pipeline(PipelineError::Stage { stage, reason }) => {
                ApiError::StageFailed {
                    stage: stage.to_string(),
                    reason,
                }
            }
            ReportError::Pipeline(PipelineError::Io(e)) => ApiError::Internal(e.to_string()),
            ReportError::Extraction(e) => ApiError::Internal(e.to_string()),
            ReportError::Io(e) => ApiError::Internal(e.to_string()),
            ReportError::LockPoisoned => ApiError::Internal("lock poisoned".into()),
        }
    }
}
