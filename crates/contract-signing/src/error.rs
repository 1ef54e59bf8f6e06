use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::signatures::{RepositoryError, SignatureServiceError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Signature(SignatureServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Signature(err) => write!(f, "signature workflow error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Signature(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Signature(err) => signature_status_code(err),
            AppError::Config(_) | AppError::Telemetry(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match self {
            AppError::Signature(err) => err.to_string(),
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// HTTP status for each workflow failure; the router and the service binary share it.
pub fn signature_status_code(err: &SignatureServiceError) -> StatusCode {
    match err {
        SignatureServiceError::ContractNotFound
        | SignatureServiceError::PendingSignatureNotFound(_) => StatusCode::NOT_FOUND,
        SignatureServiceError::InvalidState { .. } | SignatureServiceError::InvalidToken(_) => {
            StatusCode::BAD_REQUEST
        }
        SignatureServiceError::Forbidden => StatusCode::FORBIDDEN,
        SignatureServiceError::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SignatureServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        SignatureServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        SignatureServiceError::ExpirationOutOfRange { .. }
        | SignatureServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<SignatureServiceError> for AppError {
    fn from(value: SignatureServiceError) -> Self {
        Self::Signature(value)
    }
}
