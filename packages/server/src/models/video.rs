use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::video;
use crate::error::AppError;
use crate::models::user::UserSummary;

pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Accepted video MIME types.
pub const VIDEO_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/webm",
    "video/quicktime",
    "video/x-matroska",
    "video/x-msvideo",
    "video/avi",
    "video/mov",
];

/// Accepted image MIME types (profile images, thumbnails).
pub const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// A root video or reply as returned by the API.
#[derive(Serialize, Clone, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    #[schema(example = 7)]
    pub id: i32,
    /// Author; `None` only if the author row vanished mid-request.
    pub user: Option<UserSummary>,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    /// Size of the video file in bytes.
    pub file_size: i64,
    #[schema(example = "video/mp4")]
    pub mime_type: String,
    pub description: String,
    #[schema(example = json!(["cooking", "pasta"]))]
    pub hashtags: Vec<String>,
    pub is_reply: bool,
    /// Parent video id, present iff `is_reply`.
    pub parent_video: Option<i32>,
    pub likes_count: u64,
    pub saved_count: u64,
    pub views: i64,
    pub shares: i64,
    pub replies_count: u64,
    /// Active replies, embedded on root videos.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(no_recursion)]
    pub replies: Option<Vec<VideoResponse>>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Engagement numbers for one video, gathered by the caller.
#[derive(Default, Clone, Copy)]
pub struct VideoCounts {
    pub likes: u64,
    pub saves: u64,
    pub replies: u64,
}

impl VideoResponse {
    pub fn build(model: video::Model, user: Option<UserSummary>, counts: VideoCounts) -> Self {
        Self {
            id: model.id,
            user,
            hashtags: hashtags_from_json(&model.hashtags),
            video_url: model.video_url,
            thumbnail_url: model.thumbnail_url,
            file_size: model.file_size,
            mime_type: model.mime_type,
            description: model.description,
            is_reply: model.is_reply,
            parent_video: model.parent_video_id,
            likes_count: counts.likes,
            saved_count: counts.saves,
            views: model.views,
            shares: model.shares,
            replies_count: counts.replies,
            replies: None,
            is_public: model.is_public,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// `201` body for uploads and replies.
#[derive(Serialize, utoipa::ToSchema)]
pub struct VideoCreatedResponse {
    pub message: String,
    pub video: VideoResponse,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVideoResponse {
    pub message: String,
    /// Replies removed together with a root video.
    pub deleted_replies: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub liked: bool,
    pub likes_count: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub saved: bool,
    pub saved_count: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ViewResponse {
    pub success: bool,
    pub views: i64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ShareResponse {
    pub success: bool,
    pub shares: i64,
}

pub fn validate_description(description: &str) -> Result<(), AppError> {
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(AppError::Validation(format!(
            "Description must be at most {DESCRIPTION_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

/// Extract `#tags` from a description: lowercased, de-duplicated, in order of
/// first appearance. A tag is the run of letters, digits, and underscores after `#`.
pub fn extract_hashtags(description: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut tags = Vec::new();

    for (i, _) in description.match_indices('#') {
        let tag: String = description[i + 1..]
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .flat_map(char::to_lowercase)
            .collect();
        if !tag.is_empty() && seen.insert(tag.clone()) {
            tags.push(tag);
        }
    }

    tags
}

pub fn hashtags_to_json(tags: &[String]) -> serde_json::Value {
    serde_json::Value::from(tags.to_vec())
}

fn hashtags_from_json(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}
