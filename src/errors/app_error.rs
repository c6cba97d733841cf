use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::core::orchestrator::{ConversionError, ConversionFailure, OrchestratorError};
use crate::core::storage::StorageError;
use crate::core::tts::{ProviderError, ProviderErrorKind};

/// Error codes for structured error responses
pub mod error_codes {
    pub const VALIDATION_ERROR: &str = "validation_error";
    pub const INVALID_RANGE_HEADER: &str = "invalid_range_header";
    pub const INVALID_ID: &str = "invalid_id";
    pub const NOT_FOUND: &str = "not_found";
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    pub const RANGE_NOT_SATISFIABLE: &str = "range_not_satisfiable";
    pub const SERVICE_UNAVAILABLE: &str = "service_unavailable";
    pub const PROVIDER_ERROR: &str = "provider_error";
    pub const PROVIDER_TIMEOUT: &str = "provider_timeout";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

static INCLUDE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Include diagnostic details in error bodies (development environments).
/// Debug builds always include them.
pub fn set_include_details(enabled: bool) {
    INCLUDE_DETAILS.store(enabled, Ordering::Relaxed);
}

fn include_details() -> bool {
    cfg!(debug_assertions) || INCLUDE_DETAILS.load(Ordering::Relaxed)
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid Range header: {0}")]
    InvalidRangeHeader(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Requested range not satisfiable for {size} bytes")]
    RangeNotSatisfiable { size: u64 },

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error(transparent)]
    Provider(ProviderError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the error code for structured error responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => error_codes::VALIDATION_ERROR,
            AppError::InvalidRangeHeader(_) => error_codes::INVALID_RANGE_HEADER,
            AppError::InvalidId(_) => error_codes::INVALID_ID,
            AppError::NotFound(_) => error_codes::NOT_FOUND,
            AppError::PayloadTooLarge(_) => error_codes::PAYLOAD_TOO_LARGE,
            AppError::RangeNotSatisfiable { .. } => error_codes::RANGE_NOT_SATISFIABLE,
            AppError::ServiceUnavailable(_) => error_codes::SERVICE_UNAVAILABLE,
            AppError::Provider(e) if e.kind == ProviderErrorKind::Timeout => {
                error_codes::PROVIDER_TIMEOUT
            }
            AppError::Provider(_) => error_codes::PROVIDER_ERROR,
            AppError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidRangeHeader(_) | AppError::InvalidId(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Provider(e) if e.kind == ProviderErrorKind::Timeout => {
                StatusCode::GATEWAY_TIMEOUT
            }
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients
    fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Log the error at the appropriate level
    pub fn log(&self, correlation_id: &str) {
        match self {
            AppError::Internal(msg) => {
                tracing::error!(correlation_id, "Internal server error: {}", msg);
            }
            AppError::Provider(_) | AppError::ServiceUnavailable(_) => {
                tracing::warn!(correlation_id, "{}", self);
            }
            _ => tracing::debug!(correlation_id, "{}", self),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let correlation_id = Uuid::new_v4().to_string();
        self.log(&correlation_id);

        let status = self.status_code();
        let mut error = json!({
            "code": self.error_code(),
            "message": self.public_message(),
            "timestamp": Utc::now().to_rfc3339(),
            "correlationId": correlation_id,
        });
        if include_details() {
            error["details"] = json!(format!("{self:?}"));
        }

        let mut response = (status, Json(json!({ "error": error }))).into_response();

        if let AppError::RangeNotSatisfiable { size } = &self
            && let Ok(value) = HeaderValue::from_str(&format!("bytes */{size}"))
        {
            response.headers_mut().insert(header::CONTENT_RANGE, value);
        }

        response
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => AppError::NotFound(format!("Audio {id} not found")),
            StorageError::InvalidId(id) => AppError::InvalidId(id),
            StorageError::PayloadTooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            StorageError::RangeNotSatisfiable { size, .. } => AppError::RangeNotSatisfiable { size },
            StorageError::WriteFailure(_) | StorageError::Io(_) | StorageError::Serialization(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::Validation(msg) => AppError::Validation(msg),
            ConversionError::ServiceUnavailable(msg) => AppError::ServiceUnavailable(msg),
            ConversionError::Provider(e) => AppError::Provider(e),
            ConversionError::Storage(e) => AppError::Internal(format!("Failed to store audio: {e}")),
        }
    }
}

impl From<ConversionFailure> for AppError {
    fn from(failure: ConversionFailure) -> Self {
        failure.source.into()
    }
}

impl From<OrchestratorError> for AppError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::NotFound(id) => AppError::NotFound(format!("Conversion {id} not found")),
        }
    }
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
