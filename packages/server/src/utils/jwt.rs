use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::role::Role;

/// JWT Claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub uid: i32,     // User ID
    pub role: Role,   // Role at issue time; the stored role is authoritative
    pub iat: u64,     // Issued at
    pub exp: u64,     // Expiration timestamp
}

/// Sign a new JWT token for a user, valid for `ttl_secs` from now.
pub fn sign(user_id: i32, role: Role, secret: &str, ttl_secs: u64) -> Result<String> {
    let now = u64::try_from(Utc::now().timestamp()).context("system clock before epoch")?;
    sign_at(user_id, role, secret, now, ttl_secs)
}

/// Sign a token as if issued at `issued_at` (unix seconds).
pub fn sign_at(
    user_id: i32,
    role: Role,
    secret: &str,
    issued_at: u64,
    ttl_secs: u64,
) -> Result<String> {
    let claims = Claims {
        uid: user_id,
        role,
        iat: issued_at,
        exp: issued_at.saturating_add(ttl_secs),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode a JWT token.
///
/// Expiry is checked without leeway: a token is rejected the second after `exp`.
pub fn verify(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::TokenInvalid,
    })
}
