use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,
    /// Always stored lowercase.
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string. Never serialized into responses.
    pub password: String,
    /// One of: `user`, `creator`, `admin`.
    pub role: String,

    pub bio: String,
    pub profile_image: String,
    pub profile_image_key: Option<String>,

    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub banned_at: Option<DateTimeUtc>,
    pub is_active: bool,

    #[sea_orm(has_many)]
    pub videos: HasMany<super::video::Entity>,

    pub last_login: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
