//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::billing::{CheckoutError, WebhookError};
use crate::progression::ProgressionError;
use crate::store::StoreError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing identity (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Access not paid for (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Submission for a house other than the current one (409)
    #[error("Out of order: {0}")]
    OutOfOrder(String),

    /// Concurrent submission already applied (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store or payment collaborator missing (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ProgressionError> for ApiError {
    fn from(err: ProgressionError) -> Self {
        let message = err.to_string();
        match err {
            ProgressionError::ProgressNotFound => ApiError::NotFound(message),
            ProgressionError::OutOfOrder { .. } => ApiError::OutOfOrder(message),
            ProgressionError::AccessDenied => ApiError::Forbidden(message),
            ProgressionError::Conflict => ApiError::Conflict(message),
            ProgressionError::Store(store) => store.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable => ApiError::ServiceUnavailable("Banco de dados indisponível".to_string()),
            StoreError::ProgressNotFound(_) => ApiError::NotFound("Progresso não encontrado".to_string()),
            StoreError::Conflict { .. } => ApiError::Conflict(err.to_string()),
            StoreError::Database(_) | StoreError::InvalidAdvance(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        ApiError::BadRequest(format!("Webhook Error: {}", err))
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        tracing::error!(error = %err, "Checkout session creation failed");
        ApiError::ServiceUnavailable("Falha ao criar sessão de pagamento".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::OutOfOrder(msg) => (StatusCode::CONFLICT, "OUT_OF_ORDER", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg)
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
