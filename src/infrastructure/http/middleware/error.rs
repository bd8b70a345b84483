use crate::domain::errors::CalculationError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    /// The body could not be read as JSON
    BadRequest(String),
    /// Well-formed body with invalid content
    Validation { kind: &'static str, detail: String },
    /// Valid input that admits no answer
    Unprocessable { kind: &'static str, detail: String },
    ServiceUnavailable(String),
    Timeout(String),
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Validation { kind, .. } | ApiError::Unprocessable { kind, .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, *kind)
            }
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "holiday_source_unavailable")
            }
            ApiError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        }
    }

    fn detail(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::ServiceUnavailable(msg)
            | ApiError::Timeout(msg) => msg,
            ApiError::Validation { detail, .. } | ApiError::Unprocessable { detail, .. } => {
                detail
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Validation { detail, .. } => write!(f, "Validation failed: {}", detail),
            ApiError::Unprocessable { detail, .. } => write!(f, "Unprocessable: {}", detail),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::Timeout(msg) => write!(f, "Timeout: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();

        if status.is_server_error() {
            tracing::error!("Request failed with {}: {}", status, self);
        } else {
            tracing::debug!("Request rejected with {}: {}", status, self);
        }

        let body = Json(json!({
            "detail": self.detail(),
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

impl From<CalculationError> for ApiError {
    fn from(err: CalculationError) -> Self {
        let kind = err.kind();
        match err {
            CalculationError::Validation(msg) => ApiError::Validation { kind, detail: msg },
            CalculationError::InvalidTarget(_) => ApiError::Validation {
                kind,
                detail: err.to_string(),
            },
            CalculationError::UnboundedSearch { .. } => ApiError::Unprocessable {
                kind,
                detail: err.to_string(),
            },
            CalculationError::HolidaySourceUnavailable { .. } => {
                ApiError::ServiceUnavailable(err.to_string())
            }
            CalculationError::Timeout => ApiError::Timeout(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError::Validation {
                kind: "validation_error",
                detail: e.body_text(),
            },
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
