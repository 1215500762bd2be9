//! Unified error handling for the scheduling API.
//!
//! Handlers return `ApiResult` so `?` works naturally; each variant maps to a
//! status code and a structured `ErrorResponse` body. Remote calendar failures
//! are deliberately absent here: they travel in-band as `EventResult::Failed`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::api::ErrorResponse;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving or mutating the persisted credential.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Token file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize credential: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Authorization failed: {0:#}")]
    Consent(#[source] anyhow::Error),

    #[error("Authorization completed without any token")]
    EmptyGrant,
}

impl CredentialError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CredentialError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Unified error type for API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Consent ceremony failed or produced no usable credential
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Token file could not be written or removed
    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Consent(_) | CredentialError::EmptyGrant => {
                ApiError::Authorization(err.to_string())
            }
            CredentialError::Io { .. } | CredentialError::Serialize(_) => {
                ApiError::Storage(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("bad_request", msg.clone()),
            ),
            ApiError::Authorization(msg) => {
                tracing::error!("Authorization error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse::with_details(
                        "authorization_failed",
                        "Could not obtain calendar authorization",
                        msg.clone(),
                    ),
                )
            }
            ApiError::Storage(msg) => {
                tracing::error!("Credential storage error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details(
                        "storage_error",
                        "Credential storage failed",
                        msg.clone(),
                    ),
                )
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details(
                        "internal_error",
                        "Internal server error",
                        e.to_string(),
                    ),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
