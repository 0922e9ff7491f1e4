use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::user;
use crate::error::AppError;
use crate::models::role::Role;
use crate::models::shared::Pagination;
use crate::models::video::VideoResponse;

pub const BIO_MAX_CHARS: usize = 150;
pub const DEFAULT_PROFILE_IMAGE: &str = "/default-avatar.png";
pub const SEARCH_MIN_CHARS: usize = 2;

/// Full account view. Returned to the account owner and to admins.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "a@x.com")]
    pub email: String,
    pub role: Role,
    pub bio: String,
    #[schema(example = "/default-avatar.png")]
    pub profile_image: String,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            role: m.role.parse().unwrap_or_default(),
            username: m.username,
            email: m.email,
            bio: m.bio,
            profile_image: m.profile_image,
            is_banned: m.is_banned,
            ban_reason: m.ban_reason,
            is_active: m.is_active,
            last_login: m.last_login,
            created_at: m.created_at,
        }
    }
}

/// Author block embedded in video responses and follow lists.
#[derive(Serialize, Clone, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "/default-avatar.png")]
    pub profile_image: String,
}

impl From<&user::Model> for UserSummary {
    fn from(m: &user::Model) -> Self {
        Self {
            id: m.id,
            username: m.username.clone(),
            profile_image: m.profile_image.clone(),
        }
    }
}

/// Publicly visible account fields.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicUserResponse {
    pub id: i32,
    pub username: String,
    pub profile_image: String,
    pub role: Role,
    pub bio: String,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for PublicUserResponse {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            role: m.role.parse().unwrap_or_default(),
            username: m.username,
            profile_image: m.profile_image,
            bio: m.bio,
            created_at: m.created_at,
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateUsernameRequest {
    #[schema(example = "alice_2")]
    pub username: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateBioRequest {
    #[schema(example = "Short clips about cooking")]
    pub bio: String,
}

pub fn validate_bio(bio: &str) -> Result<(), AppError> {
    if bio.chars().count() > BIO_MAX_CHARS {
        return Err(AppError::Validation(format!(
            "Bio must be at most {BIO_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

/// `{ message, user }` acknowledgement of a profile change.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserUpdatedResponse {
    pub message: String,
    pub user: UserResponse,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileImageResponse {
    pub message: String,
    #[schema(example = "https://media.example.com/profiles/1718000000000-me.png")]
    pub profile_image: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FollowResponse {
    pub message: String,
    /// `false` when the caller already followed the target.
    pub followed: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UnfollowResponse {
    pub message: String,
    /// `false` when the caller was not following the target.
    pub unfollowed: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FollowListResponse {
    pub users: Vec<UserSummary>,
    pub count: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub videos_count: u64,
    pub replies_count: u64,
    /// Likes across the user's root videos.
    pub total_likes: u64,
    /// Views across the user's root videos.
    pub total_views: i64,
    /// Replies received on the user's root videos.
    pub total_replies: u64,
    pub followers_count: u64,
    pub following_count: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProfileResponse {
    pub user: PublicUserResponse,
    pub videos: Vec<VideoResponse>,
    pub replies: Vec<VideoResponse>,
    pub stats: ProfileStats,
}

pub fn validate_search_query(query: &str) -> Result<(), AppError> {
    if query.trim().chars().count() < SEARCH_MIN_CHARS {
        return Err(AppError::Validation(format!(
            "Search query must be at least {SEARCH_MIN_CHARS} characters"
        )));
    }
    Ok(())
}

// ── Admin ──

#[derive(Deserialize, utoipa::IntoParams)]
pub struct UserListQuery {
    /// Page number (1-based, default 1).
    pub page: Option<u64>,
    /// Items per page (1-100, default 100).
    pub limit: Option<u64>,
    /// Only users with this role.
    pub role: Option<String>,
    /// Case-insensitive substring of username or email.
    pub search: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateRoleRequest {
    #[schema(example = "creator")]
    pub role: String,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct BanRequest {
    #[schema(example = "Spam")]
    pub reason: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserResponse {
    pub message: String,
    pub deleted_user_id: i32,
    pub deleted_videos_count: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RoleCounts {
    pub admin: u64,
    pub creator: u64,
    pub user: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsResponse {
    pub total: u64,
    pub roles: RoleCounts,
    pub banned: u64,
    /// Accounts created in the last 7 days.
    pub recent_users: u64,
    pub timestamp: DateTime<Utc>,
}
