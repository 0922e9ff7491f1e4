use chrono::Utc;
use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder, SqliteQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::config::BootstrapAdminConfig;
use crate::entity::{user, video};
use crate::models::role::Role;
use crate::models::user::DEFAULT_PROFILE_IMAGE;
use crate::utils::hash;

/// Create the configured admin account unless its email is already registered.
///
/// An existing account is left untouched, including its role.
pub async fn seed_bootstrap_admin(
    db: &DatabaseConnection,
    admin: &BootstrapAdminConfig,
) -> anyhow::Result<()> {
    let email = admin.email.trim().to_lowercase();
    if user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(db)
        .await?
        .is_some()
    {
        return Ok(());
    }

    let hash = hash::hash_password(&admin.password)
        .map_err(|e| anyhow::anyhow!("Failed to hash bootstrap admin password: {e}"))?;

    let now = Utc::now();
    let model = user::ActiveModel {
        username: Set(admin.username.trim().to_string()),
        email: Set(email),
        password: Set(hash),
        role: Set(Role::Admin.to_string()),
        bio: Set(String::new()),
        profile_image: Set(DEFAULT_PROFILE_IMAGE.to_string()),
        profile_image_key: Set(None),
        is_banned: Set(false),
        ban_reason: Set(None),
        banned_at: Set(None),
        is_active: Set(true),
        last_login: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = model.insert(db).await?;
    info!(user_id = created.id, "Seeded bootstrap admin");

    Ok(())
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Reply listing and cascade lookups:
    // SELECT ... FROM video WHERE parent_video_id = ? ORDER BY created_at
    create_index(
        db,
        "idx_video_parent_created",
        Index::create()
            .if_not_exists()
            .name("idx_video_parent_created")
            .table(video::Entity)
            .col(video::Column::ParentVideoId)
            .col(video::Column::CreatedAt)
            .to_owned(),
    )
    .await;

    // Per-user video and reply listings
    create_index(
        db,
        "idx_video_user_reply",
        Index::create()
            .if_not_exists()
            .name("idx_video_user_reply")
            .table(video::Entity)
            .col(video::Column::UserId)
            .col(video::Column::IsReply)
            .to_owned(),
    )
    .await;

    Ok(())
}

async fn create_index(db: &DatabaseConnection, name: &str, index: IndexCreateStatement) {
    let stmt = match db.get_database_backend() {
        DbBackend::Sqlite => index.to_string(SqliteQueryBuilder),
        _ => index.to_string(PostgresQueryBuilder),
    };

    match db.execute_unprepared(&stmt).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => tracing::warn!("Failed to create index {}: {}", name, e),
    }
}
