use axum::extract::{Multipart, Path, Query, State};
use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{user, video};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::handlers::upload::{FilePart, multipart_error, read_file_field, read_text_field};
use crate::media::{MediaFolder, MediaLocator, UploadedMedia};
use crate::models::role::Role;
use crate::models::shared::{LimitQuery, PageQuery};
use crate::models::video::{
    DeleteVideoResponse, IMAGE_MIME_TYPES, LikeResponse, SaveResponse, ShareResponse,
    VIDEO_MIME_TYPES, VideoCreatedResponse, VideoResponse, ViewResponse, extract_hashtags,
    hashtags_to_json, validate_description,
};
use crate::services::catalog::VideoCatalog;
use crate::services::engagement::EngagementService;
use crate::services::lifecycle::ContentLifecycle;
use crate::services::policy::{ContentRef, may_delete};
use crate::state::AppState;

/// Parsed `multipart/form-data` body of an upload or reply.
struct VideoForm {
    video: FilePart,
    description: String,
    thumbnail: Option<FilePart>,
}

async fn read_video_form(state: &AppState, mut multipart: Multipart) -> Result<VideoForm, AppError> {
    let limits = &state.config.storage;
    let mut video = None;
    let mut description = String::new();
    let mut thumbnail = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("video") => {
                video = Some(read_file_field(field, limits.max_video_size, VIDEO_MIME_TYPES).await?);
            }
            Some("thumbnail") => {
                thumbnail =
                    Some(read_file_field(field, limits.max_image_size, IMAGE_MIME_TYPES).await?);
            }
            Some("description") => {
                description = read_text_field(field).await?;
            }
            _ => {} // Ignore unknown fields.
        }
    }

    let video = video.ok_or_else(|| AppError::Validation("Missing 'video' file field".into()))?;
    let description = description.trim().to_string();
    validate_description(&description)?;

    Ok(VideoForm {
        video,
        description,
        thumbnail,
    })
}

/// Upload media, then insert the row. Uploaded objects are removed again if
/// the insert fails.
async fn store_video(
    state: &AppState,
    owner: &user::Model,
    form: VideoForm,
    parent_video_id: Option<i32>,
) -> Result<video::Model, AppError> {
    let media = &state.media;
    let file_size = i64::try_from(form.video.data.len()).unwrap_or(i64::MAX);
    let mime_type = form.video.content_type.clone();

    let uploaded_video: UploadedMedia = media
        .upload_video(form.video.data, &form.video.filename, &form.video.content_type)
        .await?;

    let uploaded_thumb = match form.thumbnail {
        Some(thumb) => match media
            .upload_image(thumb.data, &thumb.filename, &thumb.content_type, MediaFolder::Thumbnails)
            .await
        {
            Ok(t) => Some(t),
            Err(e) => {
                media
                    .delete_best_effort(&MediaLocator::ByKey(uploaded_video.key.to_string()))
                    .await;
                return Err(e.into());
            }
        },
        None => None,
    };

    let now = Utc::now();
    let hashtags = extract_hashtags(&form.description);
    let model = video::ActiveModel {
        user_id: Set(owner.id),
        video_url: Set(uploaded_video.url.clone()),
        video_key: Set(Some(uploaded_video.key.to_string())),
        thumbnail_url: Set(uploaded_thumb.as_ref().map(|t| t.url.clone())),
        thumbnail_key: Set(uploaded_thumb.as_ref().map(|t| t.key.to_string())),
        file_size: Set(file_size),
        mime_type: Set(mime_type),
        description: Set(form.description),
        hashtags: Set(hashtags_to_json(&hashtags)),
        is_reply: Set(parent_video_id.is_some()),
        parent_video_id: Set(parent_video_id),
        views: Set(0),
        shares: Set(0),
        is_public: Set(true),
        is_active: Set(true),
        report_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    match model.insert(&state.db).await {
        Ok(saved) => Ok(saved),
        Err(e) => {
            media
                .delete_best_effort(&MediaLocator::ByKey(uploaded_video.key.to_string()))
                .await;
            if let Some(thumb) = uploaded_thumb {
                media
                    .delete_best_effort(&MediaLocator::ByKey(thumb.key.to_string()))
                    .await;
            }
            Err(e.into())
        }
    }
}

pub(crate) async fn find_video<C: ConnectionTrait>(
    db: &C,
    video_id: i32,
) -> Result<video::Model, AppError> {
    video::Entity::find_by_id(video_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".into()))
}

pub(crate) async fn find_user_by_username<C: ConnectionTrait>(
    db: &C,
    username: &str,
) -> Result<user::Model, AppError> {
    user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Videos",
    operation_id = "uploadVideo",
    summary = "Upload a root video",
    description = "Multipart fields: `video` (required; mp4, webm, quicktime, matroska, avi), \
        `description` (at most 500 characters; `#tags` become hashtags), and an optional \
        `thumbnail` image. Requires role `creator` or `admin`.",
    request_body(content_type = "multipart/form-data", description = "Video upload"),
    responses(
        (status = 201, description = "Video created", body = VideoCreatedResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 415, description = "Unsupported file type (UNSUPPORTED_MEDIA_TYPE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_role(&[Role::Creator, Role::Admin])?;

    let form = read_video_form(&state, multipart).await?;
    let saved = store_video(&state, &auth_user.user, form, None).await?;
    tracing::info!(video_id = saved.id, "Video uploaded");

    let video = VideoCatalog::new(&state.db).present_one(saved).await?;
    Ok((
        StatusCode::CREATED,
        Json(VideoCreatedResponse {
            message: "Video uploaded successfully".into(),
            video,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/reply/{video_id}",
    tag = "Videos",
    operation_id = "replyToVideo",
    summary = "Upload a video reply",
    description = "Same multipart fields as an upload. The parent must be a root video; \
        replies to replies are rejected.",
    params(("video_id" = i32, Path, description = "Parent video ID")),
    request_body(content_type = "multipart/form-data", description = "Reply upload"),
    responses(
        (status = 201, description = "Reply created", body = VideoCreatedResponse),
        (status = 400, description = "Validation error or parent is a reply (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
        (status = 404, description = "Parent video not found (NOT_FOUND)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 415, description = "Unsupported file type (UNSUPPORTED_MEDIA_TYPE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload_reply(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(video_id): Path<i32>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_role(&Role::ALL)?;

    let parent = find_video(&state.db, video_id).await?;
    if parent.is_reply {
        return Err(AppError::Validation(
            "Cannot reply to a reply; reply to the root video instead".into(),
        ));
    }

    let form = read_video_form(&state, multipart).await?;
    let saved = store_video(&state, &auth_user.user, form, Some(parent.id)).await?;
    tracing::info!(reply_id = saved.id, "Reply uploaded");

    let video = VideoCatalog::new(&state.db).present_one(saved).await?;
    Ok((
        StatusCode::CREATED,
        Json(VideoCreatedResponse {
            message: "Reply uploaded successfully".into(),
            video,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Videos",
    operation_id = "listVideos",
    summary = "List root videos",
    description = "Active root videos, newest first, each with its active replies embedded. \
        Paged with `page` and `limit` (default 20, at most 100).",
    params(PageQuery),
    responses(
        (status = 200, description = "Videos", body = Vec<VideoResponse>),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_videos(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<VideoResponse>>, AppError> {
    let (page, limit) = query.resolve();
    let videos = video::Entity::find()
        .filter(video::Column::IsReply.eq(false))
        .filter(video::Column::IsActive.eq(true))
        .order_by_desc(video::Column::CreatedAt)
        .order_by_desc(video::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page - 1)
        .await?;

    Ok(Json(VideoCatalog::new(&state.db).present(videos, true).await?))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Videos",
    operation_id = "getVideo",
    summary = "Get a video",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Video", body = VideoResponse),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<i32>,
) -> Result<Json<VideoResponse>, AppError> {
    let video = find_video(&state.db, video_id).await?;
    Ok(Json(VideoCatalog::new(&state.db).present_one(video).await?))
}

#[utoipa::path(
    get,
    path = "/trending/popular",
    tag = "Videos",
    operation_id = "trendingVideos",
    summary = "Trending root videos",
    description = "Active public root videos ordered by views, then likes.",
    params(LimitQuery),
    responses(
        (status = 200, description = "Videos", body = Vec<VideoResponse>),
    ),
)]
#[instrument(skip(state, query))]
pub async fn trending(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<VideoResponse>>, AppError> {
    let catalog = VideoCatalog::new(&state.db);
    let ranked = catalog.trending(query.resolve()).await?;
    Ok(Json(catalog.present(ranked, true).await?))
}

#[utoipa::path(
    get,
    path = "/user/{username}",
    tag = "Videos",
    operation_id = "userVideos",
    summary = "Root videos of a user",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Videos", body = Vec<VideoResponse>),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn user_videos(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<VideoResponse>>, AppError> {
    let owner = find_user_by_username(&state.db, &username).await?;
    let videos = video::Entity::find()
        .filter(video::Column::UserId.eq(owner.id))
        .filter(video::Column::IsReply.eq(false))
        .filter(video::Column::IsActive.eq(true))
        .order_by_desc(video::Column::CreatedAt)
        .order_by_desc(video::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(VideoCatalog::new(&state.db).present(videos, true).await?))
}

#[utoipa::path(
    get,
    path = "/user/{username}/replies",
    tag = "Videos",
    operation_id = "userReplies",
    summary = "Replies posted by a user",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Replies", body = Vec<VideoResponse>),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn user_replies(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<VideoResponse>>, AppError> {
    let owner = find_user_by_username(&state.db, &username).await?;
    let replies = video::Entity::find()
        .filter(video::Column::UserId.eq(owner.id))
        .filter(video::Column::IsReply.eq(true))
        .filter(video::Column::IsActive.eq(true))
        .order_by_desc(video::Column::CreatedAt)
        .order_by_desc(video::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(VideoCatalog::new(&state.db).present(replies, false).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Videos",
    operation_id = "deleteVideo",
    summary = "Delete a video or reply",
    description = "Allowed for the author, an admin, or (for a reply) the author of the parent \
        video. Deleting a root video first deletes all of its replies. Media is removed \
        best-effort; the deletion completes even if the client disconnects.",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Deleted", body = DeleteVideoResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(video_id): Path<i32>,
) -> Result<Json<DeleteVideoResponse>, AppError> {
    let target = find_video(&state.db, video_id).await?;

    let parent_owner = match (target.is_reply, target.parent_video_id) {
        (true, Some(parent_id)) => video::Entity::find_by_id(parent_id)
            .one(&state.db)
            .await?
            .map(|p| p.user_id),
        _ => None,
    };

    let item = ContentRef {
        owner_id: target.user_id,
        is_reply: target.is_reply,
    };
    if !may_delete(&auth_user.actor(), &item, parent_owner) {
        return Err(AppError::PermissionDenied);
    }

    // Detached so a client disconnect cannot cancel a half-done cascade.
    let db = state.db.clone();
    let media = state.media.clone();
    let outcome = tokio::spawn(async move {
        ContentLifecycle::new(&db, &media).delete(&target).await
    })
    .await
    .map_err(|e| AppError::Internal(format!("Delete task failed: {e}")))??;

    tracing::info!(
        replies_deleted = outcome.replies_deleted,
        target_deleted = outcome.target_deleted,
        "Video deleted"
    );

    Ok(Json(DeleteVideoResponse {
        message: "Video deleted successfully".into(),
        deleted_replies: outcome.replies_deleted,
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/like",
    tag = "Videos",
    operation_id = "toggleLike",
    summary = "Like or unlike a video",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "New like state", body = LikeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn toggle_like(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(video_id): Path<i32>,
) -> Result<Json<LikeResponse>, AppError> {
    find_video(&state.db, video_id).await?;
    let toggle = EngagementService::new(&state.db)
        .toggle_like(video_id, auth_user.user_id)
        .await?;
    Ok(Json(LikeResponse {
        liked: toggle.on,
        likes_count: toggle.count,
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/save",
    tag = "Videos",
    operation_id = "toggleSave",
    summary = "Save or unsave a video",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "New save state", body = SaveResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, TOKEN_EXPIRED)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn toggle_save(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(video_id): Path<i32>,
) -> Result<Json<SaveResponse>, AppError> {
    find_video(&state.db, video_id).await?;
    let toggle = EngagementService::new(&state.db)
        .toggle_save(video_id, auth_user.user_id)
        .await?;
    Ok(Json(SaveResponse {
        saved: toggle.on,
        saved_count: toggle.count,
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/view",
    tag = "Videos",
    operation_id = "recordView",
    summary = "Count a view",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "New view count", body = ViewResponse),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn record_view(
    State(state): State<AppState>,
    Path(video_id): Path<i32>,
) -> Result<Json<ViewResponse>, AppError> {
    let video = find_video(&state.db, video_id).await?;
    let views = EngagementService::new(&state.db).record_view(video).await?;
    Ok(Json(ViewResponse {
        success: true,
        views,
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/share",
    tag = "Videos",
    operation_id = "recordShare",
    summary = "Count a share",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "New share count", body = ShareResponse),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn record_share(
    State(state): State<AppState>,
    Path(video_id): Path<i32>,
) -> Result<Json<ShareResponse>, AppError> {
    let video = find_video(&state.db, video_id).await?;
    let shares = EngagementService::new(&state.db).record_share(video).await?;
    Ok(Json(ShareResponse {
        success: true,
        shares,
    }))
}
