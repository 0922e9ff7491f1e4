use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "video")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub video_url: String,
    /// Object store key. Older rows may only carry the URL.
    pub video_key: Option<String>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_key: Option<String>,
    /// Size of the uploaded video in bytes.
    pub file_size: i64,
    pub mime_type: String,

    pub description: String,
    /// Lowercased tags without the leading `#`, stored as a JSON array of strings.
    #[sea_orm(column_type = "JsonBinary")]
    pub hashtags: serde_json::Value,

    pub is_reply: bool,
    /// Set iff `is_reply`. Points at a root video.
    pub parent_video_id: Option<i32>,

    pub views: i64,
    pub shares: i64,

    pub is_public: bool,
    pub is_active: bool,
    pub report_count: i32,

    #[sea_orm(has_many)]
    pub likes: HasMany<super::video_like::Entity>,
    #[sea_orm(has_many)]
    pub saves: HasMany<super::video_save::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
