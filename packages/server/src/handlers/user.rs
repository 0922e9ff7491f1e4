use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{user, video};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::auth::unique_user_error;
use crate::handlers::upload::{multipart_error, read_file_field};
use crate::handlers::video::find_user_by_username;
use crate::media::{MediaFolder, MediaLocator};
use crate::models::auth::{MeResponse, validate_username};
use crate::models::shared::{LimitQuery, escape_like};
use crate::models::user::{
    DEFAULT_PROFILE_IMAGE, FollowListResponse, FollowResponse, ProfileImageResponse,
    ProfileResponse, ProfileStats, PublicUserResponse, UnfollowResponse, UpdateBioRequest,
    UpdateUsernameRequest, UserResponse, UserSummary, UserUpdatedResponse, validate_bio,
    validate_search_query,
};
use crate::models::video::{IMAGE_MIME_TYPES, VideoResponse};
use crate::services::catalog::VideoCatalog;
use crate::services::engagement::EngagementService;
use crate::services::follow::FollowService;
use crate::state::AppState;

pub(crate) async fn find_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Users",
    operation_id = "getCurrentUser",
    summary = "Get the authenticated user",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED, IDENTITY_NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_me(auth_user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        user: UserResponse::from(auth_user.user),
    })
}

#[utoipa::path(
    patch,
    path = "/me/update-username",
    tag = "Users",
    operation_id = "updateUsername",
    summary = "Change the username",
    request_body = UpdateUsernameRequest,
    responses(
        (status = 200, description = "Username updated", body = UserUpdatedResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
        (status = 409, description = "Username taken (USERNAME_TAKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_username(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateUsernameRequest>,
) -> Result<Json<UserUpdatedResponse>, AppError> {
    let username = payload.username.trim().to_string();
    validate_username(&username)?;

    let taken = user::Entity::find()
        .filter(user::Column::Username.eq(&username))
        .filter(user::Column::Id.ne(auth_user.user_id))
        .one(&state.db)
        .await?
        .is_some();
    if taken {
        return Err(AppError::UsernameTaken);
    }

    let mut active: user::ActiveModel = auth_user.user.into();
    active.username = Set(username);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await.map_err(unique_user_error)?;

    Ok(Json(UserUpdatedResponse {
        message: "Username updated successfully".into(),
        user: UserResponse::from(updated),
    }))
}

#[utoipa::path(
    patch,
    path = "/me/update-bio",
    tag = "Users",
    operation_id = "updateBio",
    summary = "Change the bio",
    request_body = UpdateBioRequest,
    responses(
        (status = 200, description = "Bio updated", body = UserUpdatedResponse),
        (status = 400, description = "Bio longer than 150 characters (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_bio(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateBioRequest>,
) -> Result<Json<UserUpdatedResponse>, AppError> {
    let bio = payload.bio.trim().to_string();
    validate_bio(&bio)?;

    let mut active: user::ActiveModel = auth_user.user.into();
    active.bio = Set(bio);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    Ok(Json(UserUpdatedResponse {
        message: "Bio updated successfully".into(),
        user: UserResponse::from(updated),
    }))
}

#[utoipa::path(
    post,
    path = "/me/update-profile-image",
    tag = "Users",
    operation_id = "updateProfileImage",
    summary = "Upload a new profile image",
    description = "Multipart field `profileImage` (jpeg, png, gif, webp; at most 5 MiB). \
        The previous image is removed best-effort after the new one is stored.",
    request_body(content_type = "multipart/form-data", description = "Profile image"),
    responses(
        (status = 200, description = "Image updated", body = ProfileImageResponse),
        (status = 400, description = "Missing file (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
        (status = 413, description = "Image too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 415, description = "Unsupported image type (UNSUPPORTED_MEDIA_TYPE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn update_profile_image(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProfileImageResponse>, AppError> {
    let mut image = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("profileImage") {
            image = Some(
                read_file_field(field, state.config.storage.max_image_size, IMAGE_MIME_TYPES)
                    .await?,
            );
        }
    }
    let image =
        image.ok_or_else(|| AppError::Validation("Missing 'profileImage' file field".into()))?;

    let uploaded = state
        .media
        .upload_image(
            image.data,
            &image.filename,
            &image.content_type,
            MediaFolder::Profiles,
        )
        .await?;

    let previous = MediaLocator::from_parts(
        auth_user.user.profile_image_key.as_deref(),
        Some(&auth_user.user.profile_image),
    );

    let mut active: user::ActiveModel = auth_user.user.into();
    active.profile_image = Set(uploaded.url.clone());
    active.profile_image_key = Set(Some(uploaded.key.to_string()));
    active.updated_at = Set(Utc::now());
    let updated = match active.update(&state.db).await {
        Ok(u) => u,
        Err(e) => {
            state
                .media
                .delete_best_effort(&MediaLocator::ByKey(uploaded.key.to_string()))
                .await;
            return Err(e.into());
        }
    };

    // The default avatar does not resolve to an object key and is skipped.
    if let Some(previous) = previous
        && previous != MediaLocator::ByDerivedUrl(DEFAULT_PROFILE_IMAGE.into())
    {
        state.media.delete_best_effort(&previous).await;
    }

    Ok(Json(ProfileImageResponse {
        message: "Profile image updated successfully".into(),
        profile_image: updated.profile_image,
    }))
}

#[utoipa::path(
    delete,
    path = "/me/profile-image",
    tag = "Users",
    operation_id = "deleteProfileImage",
    summary = "Reset the profile image to the default avatar",
    responses(
        (status = 200, description = "Image reset", body = ProfileImageResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_profile_image(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileImageResponse>, AppError> {
    let previous = MediaLocator::from_parts(
        auth_user.user.profile_image_key.as_deref(),
        Some(&auth_user.user.profile_image),
    );

    let mut active: user::ActiveModel = auth_user.user.into();
    active.profile_image = Set(DEFAULT_PROFILE_IMAGE.to_string());
    active.profile_image_key = Set(None);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    if let Some(previous) = previous
        && previous != MediaLocator::ByDerivedUrl(DEFAULT_PROFILE_IMAGE.into())
    {
        state.media.delete_best_effort(&previous).await;
    }

    Ok(Json(ProfileImageResponse {
        message: "Profile image removed".into(),
        profile_image: updated.profile_image,
    }))
}

#[utoipa::path(
    get,
    path = "/me/liked-videos",
    tag = "Users",
    operation_id = "likedVideos",
    summary = "Videos the caller liked",
    responses(
        (status = 200, description = "Videos, most recently liked first", body = Vec<VideoResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn liked_videos(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<VideoResponse>>, AppError> {
    let ids = EngagementService::new(&state.db)
        .liked_video_ids(auth_user.user_id)
        .await?;
    let catalog = VideoCatalog::new(&state.db);
    let videos = catalog.by_ids_in_order(&ids).await?;
    Ok(Json(catalog.present(videos, false).await?))
}

#[utoipa::path(
    get,
    path = "/me/saved-videos",
    tag = "Users",
    operation_id = "savedVideos",
    summary = "Videos the caller saved",
    responses(
        (status = 200, description = "Videos, most recently saved first", body = Vec<VideoResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn saved_videos(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<VideoResponse>>, AppError> {
    let ids = EngagementService::new(&state.db)
        .saved_video_ids(auth_user.user_id)
        .await?;
    let catalog = VideoCatalog::new(&state.db);
    let videos = catalog.by_ids_in_order(&ids).await?;
    Ok(Json(catalog.present(videos, false).await?))
}

#[utoipa::path(
    post,
    path = "/{id}/follow",
    tag = "Follows",
    operation_id = "followUser",
    summary = "Follow a user",
    description = "Following someone already followed is a no-op (`followed: false`).",
    params(("id" = i32, Path, description = "User ID to follow")),
    responses(
        (status = 200, description = "Follow state", body = FollowResponse),
        (status = 400, description = "Cannot follow yourself (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn follow_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(target_id): Path<i32>,
) -> Result<Json<FollowResponse>, AppError> {
    if target_id == auth_user.user_id {
        return Err(AppError::Validation("You cannot follow yourself".into()));
    }
    find_user(&state.db, target_id).await?;

    let followed = FollowService::new(&state.db)
        .follow(auth_user.user_id, target_id)
        .await?;

    Ok(Json(FollowResponse {
        message: if followed {
            "Followed".into()
        } else {
            "Already following".into()
        },
        followed,
    }))
}

#[utoipa::path(
    delete,
    path = "/{id}/follow",
    tag = "Follows",
    operation_id = "unfollowUser",
    summary = "Unfollow a user",
    description = "Unfollowing someone not followed is a no-op (`unfollowed: false`).",
    params(("id" = i32, Path, description = "User ID to unfollow")),
    responses(
        (status = 200, description = "Follow state", body = UnfollowResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn unfollow_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(target_id): Path<i32>,
) -> Result<Json<UnfollowResponse>, AppError> {
    find_user(&state.db, target_id).await?;

    let unfollowed = FollowService::new(&state.db)
        .unfollow(auth_user.user_id, target_id)
        .await?;

    Ok(Json(UnfollowResponse {
        message: if unfollowed {
            "Unfollowed".into()
        } else {
            "Not following".into()
        },
        unfollowed,
    }))
}

#[utoipa::path(
    get,
    path = "/{id}/followers",
    tag = "Follows",
    operation_id = "listFollowers",
    summary = "Users following a user",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Followers", body = FollowListResponse),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_followers(
    State(state): State<AppState>,
    Path(target_id): Path<i32>,
) -> Result<Json<FollowListResponse>, AppError> {
    find_user(&state.db, target_id).await?;
    let users = FollowService::new(&state.db).followers(target_id).await?;
    Ok(Json(FollowListResponse {
        count: users.len() as u64,
        users: users.iter().map(UserSummary::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}/following",
    tag = "Follows",
    operation_id = "listFollowing",
    summary = "Users a user follows",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Followed users", body = FollowListResponse),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_following(
    State(state): State<AppState>,
    Path(target_id): Path<i32>,
) -> Result<Json<FollowListResponse>, AppError> {
    find_user(&state.db, target_id).await?;
    let users = FollowService::new(&state.db).following(target_id).await?;
    Ok(Json(FollowListResponse {
        count: users.len() as u64,
        users: users.iter().map(UserSummary::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/profile/{username}",
    tag = "Users",
    operation_id = "getProfile",
    summary = "Public profile with videos, replies, and stats",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    let owner = find_user_by_username(&state.db, &username).await?;

    let newest_first = |is_reply: bool| {
        video::Entity::find()
            .filter(video::Column::UserId.eq(owner.id))
            .filter(video::Column::IsReply.eq(is_reply))
            .filter(video::Column::IsActive.eq(true))
            .order_by_desc(video::Column::CreatedAt)
            .order_by_desc(video::Column::Id)
    };
    let roots = newest_first(false).all(&state.db).await?;
    let replies = newest_first(true).all(&state.db).await?;

    let catalog = VideoCatalog::new(&state.db);
    let videos = catalog.present(roots, true).await?;
    let replies = catalog.present(replies, false).await?;

    let follows = FollowService::new(&state.db);
    let stats = ProfileStats {
        videos_count: videos.len() as u64,
        replies_count: replies.len() as u64,
        total_likes: videos.iter().map(|v| v.likes_count).sum(),
        total_views: videos.iter().map(|v| v.views).sum(),
        total_replies: videos.iter().map(|v| v.replies_count).sum(),
        followers_count: follows.followers_count(owner.id).await?,
        following_count: follows.following_count(owner.id).await?,
    };

    Ok(Json(ProfileResponse {
        user: PublicUserResponse::from(owner),
        videos,
        replies,
        stats,
    }))
}

#[utoipa::path(
    get,
    path = "/search/{query}",
    tag = "Users",
    operation_id = "searchUsers",
    summary = "Search users by username",
    description = "Case-insensitive substring match. The query must be at least 2 characters.",
    params(
        ("query" = String, Path, description = "Search text"),
        LimitQuery,
    ),
    responses(
        (status = 200, description = "Matching users", body = Vec<PublicUserResponse>),
        (status = 400, description = "Query too short (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, limit))]
pub async fn search_users(
    State(state): State<AppState>,
    Path(query): Path<String>,
    Query(limit): Query<LimitQuery>,
) -> Result<Json<Vec<PublicUserResponse>>, AppError> {
    validate_search_query(&query)?;

    let pattern = format!("%{}%", escape_like(&query.trim().to_lowercase()));
    let users = user::Entity::find()
        .filter(
            Expr::expr(Func::lower(Expr::col(user::Column::Username)))
                .like(LikeExpr::new(pattern).escape('\\')),
        )
        .order_by_asc(user::Column::Username)
        .limit(limit.resolve())
        .all(&state.db)
        .await?;

    Ok(Json(users.into_iter().map(PublicUserResponse::from).collect()))
}
