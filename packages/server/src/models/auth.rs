use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::user::UserResponse;

pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 30;
pub const PASSWORD_MIN_CHARS: usize = 6;
pub const PASSWORD_MAX_CHARS: usize = 128;

/// Request body for user registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Unique username (3-30 chars: letters, digits, underscores, Arabic letters).
    #[schema(example = "alice")]
    pub username: String,
    /// Unique email address. Compared case-insensitively.
    #[schema(example = "a@x.com")]
    pub email: String,
    /// Password (at least 6 characters).
    #[schema(example = "secret1")]
    pub password: String,
}

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || ('\u{0600}'..='\u{06FF}').contains(&c)
}

/// Validate a trimmed username.
pub fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&len) {
        return Err(AppError::Validation(format!(
            "Username must be {USERNAME_MIN_CHARS}-{USERNAME_MAX_CHARS} characters"
        )));
    }
    if !username.chars().all(is_username_char) {
        return Err(AppError::Validation(
            "Username may contain only letters, digits, underscores, and Arabic letters".into(),
        ));
    }
    Ok(())
}

/// Accepts `local@domain.tld` with no whitespace anywhere.
pub fn validate_email(email: &str) -> Result<(), AppError> {
    let invalid = || AppError::Validation("Email address is invalid".into());

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() {
        return Err(invalid());
    }
    // Some '.' in the domain must have at least one character on each side.
    let has_inner_dot = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if has_inner_dot { Ok(()) } else { Err(invalid()) }
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if len < PASSWORD_MIN_CHARS {
        return Err(AppError::Validation(format!(
            "Password must be at least {PASSWORD_MIN_CHARS} characters"
        )));
    }
    if len > PASSWORD_MAX_CHARS {
        return Err(AppError::Validation(format!(
            "Password must be at most {PASSWORD_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    validate_username(payload.username.trim())?;
    validate_email(payload.email.trim())?;
    validate_password(&payload.password)
}

/// Request body for user login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// Email address of the account.
    #[schema(example = "a@x.com")]
    pub email: String,
    /// Account password.
    #[schema(example = "secret1")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.email.trim().is_empty() {
        return Err(AppError::Validation("Email must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Returned by both registration and login.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    #[schema(example = "User registered successfully")]
    pub message: String,
    /// JWT bearer token.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    pub user: UserResponse,
}

/// The resolved caller identity.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    pub user: UserResponse,
}
