use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use otogram_common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(true);

/// Toggle the `detail` field of internal error responses. Disabled in production.
pub fn set_expose_details(expose: bool) {
    EXPOSE_DETAILS.store(expose, Ordering::Relaxed);
}

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `TOKEN_EXPIRED`, `IDENTITY_NOT_FOUND`, `INVALID_CREDENTIALS`,
    /// `PERMISSION_DENIED`, `ACCOUNT_BANNED`, `NOT_FOUND`, `USERNAME_TAKEN`,
    /// `EMAIL_TAKEN`, `PAYLOAD_TOO_LARGE`, `UNSUPPORTED_MEDIA_TYPE`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Description must be at most 500 characters")]
    pub message: String,
    /// Underlying cause of an internal error. Omitted in production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    TokenExpired,
    /// Token was valid but its user no longer exists.
    IdentityNotFound,
    InvalidCredentials,
    PermissionDenied,
    AccountBanned,
    NotFound(String),
    UsernameTaken,
    EmailTaken,
    PayloadTooLarge(String),
    UnsupportedMediaType(String),
    Internal(String),
}

fn body(code: &'static str, message: impl Into<String>) -> ErrorBody {
    ErrorBody {
        code,
        message: message.into(),
        detail: None,
    }
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, body("VALIDATION_ERROR", msg)),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                body("TOKEN_MISSING", "Authentication required"),
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                body("TOKEN_INVALID", "Invalid token"),
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                body("TOKEN_EXPIRED", "Token has expired"),
            ),
            AppError::IdentityNotFound => (
                StatusCode::UNAUTHORIZED,
                body("IDENTITY_NOT_FOUND", "User for this token no longer exists"),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                body("INVALID_CREDENTIALS", "Invalid email or password"),
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                body("PERMISSION_DENIED", "Insufficient permissions"),
            ),
            AppError::AccountBanned => (
                StatusCode::FORBIDDEN,
                body("ACCOUNT_BANNED", "This account has been banned"),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, body("NOT_FOUND", msg)),
            AppError::UsernameTaken => (
                StatusCode::CONFLICT,
                body("USERNAME_TAKEN", "Username is already taken"),
            ),
            AppError::EmailTaken => (
                StatusCode::CONFLICT,
                body("EMAIL_TAKEN", "Email is already registered"),
            ),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                body("PAYLOAD_TOO_LARGE", msg),
            ),
            AppError::UnsupportedMediaType(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                body("UNSUPPORTED_MEDIA_TYPE", msg),
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                let mut b = body("INTERNAL_ERROR", "An unexpected error occurred");
                if EXPOSE_DETAILS.load(Ordering::Relaxed) {
                    b.detail = Some(detail);
                }
                (StatusCode::INTERNAL_SERVER_ERROR, b)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("File '{key}' not found")),
            StorageError::InvalidKey(msg) => AppError::Validation(msg),
            StorageError::SizeLimitExceeded { actual, limit } => AppError::PayloadTooLarge(
                format!("File is {actual} bytes, limit is {limit} bytes"),
            ),
            other => AppError::Internal(other.to_string()),
        }
    }
}
