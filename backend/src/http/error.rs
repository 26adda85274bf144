//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::repository::RepositoryError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Repository(RepositoryError),
}

impl AppError {
    fn parts(self) -> (StatusCode, ApiError) {
        match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg))
            }
            AppError::Repository(e) => {
                let details = e.context().to_string();
                let (status, code) = if e.is_not_found() {
                    (StatusCode::NOT_FOUND, "NOT_FOUND")
                } else if matches!(e, RepositoryError::ValidationError { .. }) {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
                } else if e.is_retryable() {
                    (StatusCode::SERVICE_UNAVAILABLE, "REPOSITORY_UNAVAILABLE")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "REPOSITORY_ERROR")
                };
                (status, ApiError::new(code, e.to_string()).with_details(details))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.parts();
        if status.is_server_error() {
            tracing::error!(code = %error.code, "{}", error.message);
        }
        (status, Json(error)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::ErrorContext;

    #[test]
    fn test_repository_errors_map_to_status() {
        let (status, body) = AppError::from(RepositoryError::not_found_with_context(
            "Facility X not found",
            ErrorContext::new("get_facility").with_entity_id("X"),
        ))
        .parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "NOT_FOUND");
        assert!(body.details.unwrap().contains("id=X"));

        let (status, _) = AppError::from(RepositoryError::connection("down")).parts();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = AppError::from(RepositoryError::query("syntax")).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, body) = AppError::from(RepositoryError::ValidationError {
            message: "blank country".into(),
            context: ErrorContext::new("country_fuel_mix"),
        })
        .parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "VALIDATION_ERROR");
    }

    #[test]
    fn test_details_omitted_when_absent() {
        let value = serde_json::to_value(ApiError::new("BAD_REQUEST", "nope")).unwrap();
        assert!(value.get("details").is_none());
    }
}
