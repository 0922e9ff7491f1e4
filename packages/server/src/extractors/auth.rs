use axum::{extract::FromRequestParts, http::request::Parts};
use sea_orm::EntityTrait;

use crate::entity::user;
use crate::error::AppError;
use crate::models::role::Role;
use crate::services::policy::Actor;
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require authentication. The token is
/// verified, then the user row is loaded once; handlers use `user` instead of
/// fetching it again. Role checks happen via `require_role()` in the handler body.
pub struct AuthUser {
    pub user_id: i32,
    pub role: Role,
    pub user: user::Model,
}

impl AuthUser {
    /// Returns `Ok(())` if the user's role is in `allowed`, `Err(PermissionDenied)` otherwise.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require_role(&[Role::Admin])
    }

    pub fn actor(&self) -> Actor {
        Actor {
            id: self.user_id,
            role: self.role,
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::TokenInvalid)?;

        let claims = jwt::verify(token, &state.config.auth.jwt_secret)?;

        let user = user::Entity::find_by_id(claims.uid)
            .one(&state.db)
            .await?
            .ok_or(AppError::IdentityNotFound)?;

        if user.is_banned || !user.is_active {
            return Err(AppError::AccountBanned);
        }

        // The stored role wins over the one in the token, so role changes
        // apply without reissuing tokens.
        let role = user
            .role
            .parse::<Role>()
            .map_err(|e| AppError::Internal(format!("user {} has {e}", user.id)))?;

        Ok(AuthUser {
            user_id: user.id,
            role,
            user,
        })
    }
}
