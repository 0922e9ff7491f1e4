use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
};
use chrono::{Duration, Utc};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::user::find_user;
use crate::models::role::Role;
use crate::models::shared::{Pagination, escape_like};
use crate::models::user::{
    BanRequest, DeleteUserResponse, RoleCounts, UpdateRoleRequest, UserListQuery,
    UserListResponse, UserResponse, UserStatsResponse, UserUpdatedResponse,
};
use crate::services::lifecycle::ContentLifecycle;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Admin",
    operation_id = "listUsers",
    summary = "List users with pagination and filters",
    description = "Newest accounts first. `search` matches username or email case-insensitively. \
        Requires role `admin`.",
    params(UserListQuery),
    responses(
        (status = 200, description = "Users", body = UserListResponse),
        (status = 400, description = "Unknown role filter (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    auth_user.require_admin()?;

    let page = Ord::max(query.page.unwrap_or(1), 1);
    let limit = query.limit.unwrap_or(100).clamp(1, 100);

    let mut select = user::Entity::find();

    if let Some(role) = query.role.as_deref().filter(|r| !r.is_empty()) {
        let role = role.parse::<Role>().map_err(AppError::Validation)?;
        select = select.filter(user::Column::Role.eq(role.as_str()));
    }

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            let pattern = format!("%{}%", term.to_lowercase());
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(user::Column::Username)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(user::Column::Email)))
                            .like(LikeExpr::new(pattern).escape('\\')),
                    ),
            );
        }
    }

    let paginator = select
        .order_by_desc(user::Column::CreatedAt)
        .order_by_desc(user::Column::Id)
        .paginate(&state.db, limit);
    let total = paginator.num_items().await?;
    let users = paginator.fetch_page(page - 1).await?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Admin",
    operation_id = "getUser",
    summary = "Get any user's account",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn get_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(target_id): Path<i32>,
) -> Result<Json<UserResponse>, AppError> {
    auth_user.require_admin()?;
    Ok(Json(UserResponse::from(find_user(&state.db, target_id).await?)))
}

#[utoipa::path(
    patch,
    path = "/role/{id}",
    tag = "Admin",
    operation_id = "updateUserRole",
    summary = "Change a user's role",
    description = "Admins cannot change their own role.",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = UserUpdatedResponse),
        (status = 400, description = "Unknown role (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
        (status = 403, description = "Forbidden or own account (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(role = %payload.role))]
pub async fn update_role(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(target_id): Path<i32>,
    AppJson(payload): AppJson<UpdateRoleRequest>,
) -> Result<Json<UserUpdatedResponse>, AppError> {
    auth_user.require_admin()?;

    let role = payload.role.parse::<Role>().map_err(AppError::Validation)?;
    let target = find_user(&state.db, target_id).await?;
    if target.id == auth_user.user_id {
        return Err(AppError::PermissionDenied);
    }

    let mut active: user::ActiveModel = target.into();
    active.role = Set(role.to_string());
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;
    tracing::info!(admin_id = auth_user.user_id, "User role updated");

    Ok(Json(UserUpdatedResponse {
        message: "User role updated successfully".into(),
        user: UserResponse::from(updated),
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}/ban",
    tag = "Admin",
    operation_id = "banUser",
    summary = "Ban a user",
    description = "Banned users cannot log in and their tokens are rejected. \
        Admins cannot ban themselves.",
    params(("id" = i32, Path, description = "User ID")),
    request_body(content = BanRequest, description = "Optional ban reason"),
    responses(
        (status = 200, description = "User banned", body = UserUpdatedResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
        (status = 403, description = "Forbidden or own account (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, body))]
pub async fn ban_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(target_id): Path<i32>,
    body: Bytes,
) -> Result<Json<UserUpdatedResponse>, AppError> {
    auth_user.require_admin()?;

    let target = find_user(&state.db, target_id).await?;
    if target.id == auth_user.user_id {
        return Err(AppError::PermissionDenied);
    }
    let payload: BanRequest = if body.iter().all(u8::is_ascii_whitespace) {
        BanRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::Validation(e.to_string()))?
    };
    let reason = payload
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    let mut active: user::ActiveModel = target.into();
    active.is_banned = Set(true);
    active.ban_reason = Set(reason);
    active.banned_at = Set(Some(Utc::now()));
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;
    tracing::info!(admin_id = auth_user.user_id, "User banned");

    Ok(Json(UserUpdatedResponse {
        message: "User banned".into(),
        user: UserResponse::from(updated),
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}/unban",
    tag = "Admin",
    operation_id = "unbanUser",
    summary = "Lift a ban",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User unbanned", body = UserUpdatedResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn unban_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(target_id): Path<i32>,
) -> Result<Json<UserUpdatedResponse>, AppError> {
    auth_user.require_admin()?;

    let target = find_user(&state.db, target_id).await?;
    let mut active: user::ActiveModel = target.into();
    active.is_banned = Set(false);
    active.ban_reason = Set(None);
    active.banned_at = Set(None);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;
    tracing::info!(admin_id = auth_user.user_id, "User unbanned");

    Ok(Json(UserUpdatedResponse {
        message: "User unbanned".into(),
        user: UserResponse::from(updated),
    }))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Admin",
    operation_id = "deleteUser",
    summary = "Delete a user and everything they own",
    description = "Deletes the profile image, every video of the user (cascading into replies), \
        the user's replies elsewhere, and all of the user's likes, saves, and follows. \
        Admins cannot delete themselves.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = DeleteUserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
        (status = 403, description = "Forbidden or own account (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(target_id): Path<i32>,
) -> Result<Json<DeleteUserResponse>, AppError> {
    auth_user.require_admin()?;

    if target_id == auth_user.user_id {
        return Err(AppError::PermissionDenied);
    }
    let target = find_user(&state.db, target_id).await?;

    let db = state.db.clone();
    let media = state.media.clone();
    let deleted_videos = tokio::spawn(async move {
        ContentLifecycle::new(&db, &media).delete_user(&target).await
    })
    .await
    .map_err(|e| AppError::Internal(format!("Delete task failed: {e}")))??;

    Ok(Json(DeleteUserResponse {
        message: "User and all of their content deleted".into(),
        deleted_user_id: target_id,
        deleted_videos_count: deleted_videos,
    }))
}

#[utoipa::path(
    get,
    path = "/stats/overview",
    tag = "Admin",
    operation_id = "userStats",
    summary = "Account statistics",
    responses(
        (status = 200, description = "Statistics", body = UserStatsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn stats_overview(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserStatsResponse>, AppError> {
    auth_user.require_admin()?;

    let db = &state.db;
    let with_role = |role: Role| {
        user::Entity::find()
            .filter(user::Column::Role.eq(role.as_str()))
            .count(db)
    };
    let since = Utc::now() - Duration::days(7);

    let total = user::Entity::find().count(db).await?;
    let roles = RoleCounts {
        admin: with_role(Role::Admin).await?,
        creator: with_role(Role::Creator).await?,
        user: with_role(Role::User).await?,
    };
    let banned = user::Entity::find()
        .filter(user::Column::IsBanned.eq(true))
        .count(db)
        .await?;
    let recent_users = user::Entity::find()
        .filter(user::Column::CreatedAt.gte(since))
        .count(db)
        .await?;

    Ok(Json(UserStatsResponse {
        total,
        roles,
        banned,
        recent_users,
        timestamp: Utc::now(),
    }))
}
