use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

use crate::entity::{video, video_like, video_save};

/// Outcome of a like or save toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggle {
    /// Membership after the toggle.
    pub on: bool,
    /// Set size after the toggle.
    pub count: u64,
}

/// Likes, saves, views, and shares on a single video.
///
/// Toggles remove the membership row if one exists and insert it otherwise,
/// each as a single conditional statement. Two racing toggles by the same
/// caller therefore behave like two sequential ones. View and share counters
/// are read-modify-write and may lose increments under concurrency.
pub struct EngagementService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> EngagementService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn toggle_like(&self, video_id: i32, user_id: i32) -> Result<Toggle, DbErr> {
        let removed = video_like::Entity::delete_by_id((video_id, user_id))
            .exec(self.conn)
            .await?
            .rows_affected
            > 0;

        if !removed {
            let model = video_like::ActiveModel {
                video_id: Set(video_id),
                user_id: Set(user_id),
                created_at: Set(Utc::now()),
            };
            let result = video_like::Entity::insert(model)
                .on_conflict(
                    OnConflict::columns([video_like::Column::VideoId, video_like::Column::UserId])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(self.conn)
                .await;
            ignore_not_inserted(result)?;
        }

        let count = video_like::Entity::find()
            .filter(video_like::Column::VideoId.eq(video_id))
            .count(self.conn)
            .await?;

        Ok(Toggle { on: !removed, count })
    }

    pub async fn toggle_save(&self, video_id: i32, user_id: i32) -> Result<Toggle, DbErr> {
        let removed = video_save::Entity::delete_by_id((video_id, user_id))
            .exec(self.conn)
            .await?
            .rows_affected
            > 0;

        if !removed {
            let model = video_save::ActiveModel {
                video_id: Set(video_id),
                user_id: Set(user_id),
                created_at: Set(Utc::now()),
            };
            let result = video_save::Entity::insert(model)
                .on_conflict(
                    OnConflict::columns([video_save::Column::VideoId, video_save::Column::UserId])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(self.conn)
                .await;
            ignore_not_inserted(result)?;
        }

        let count = video_save::Entity::find()
            .filter(video_save::Column::VideoId.eq(video_id))
            .count(self.conn)
            .await?;

        Ok(Toggle { on: !removed, count })
    }

    /// Increment the view counter. Returns the new value.
    pub async fn record_view(&self, video: video::Model) -> Result<i64, DbErr> {
        let views = video.views.saturating_add(1);
        let mut active: video::ActiveModel = video.into();
        active.views = Set(views);
        let updated = active.update(self.conn).await?;
        Ok(updated.views)
    }

    /// Increment the share counter. Returns the new value.
    pub async fn record_share(&self, video: video::Model) -> Result<i64, DbErr> {
        let shares = video.shares.saturating_add(1);
        let mut active: video::ActiveModel = video.into();
        active.shares = Set(shares);
        let updated = active.update(self.conn).await?;
        Ok(updated.shares)
    }

    /// Ids of videos the user liked, most recent like first.
    pub async fn liked_video_ids(&self, user_id: i32) -> Result<Vec<i32>, DbErr> {
        video_like::Entity::find()
            .select_only()
            .column(video_like::Column::VideoId)
            .filter(video_like::Column::UserId.eq(user_id))
            .order_by_desc(video_like::Column::CreatedAt)
            .into_tuple()
            .all(self.conn)
            .await
    }

    /// Ids of videos the user saved, most recent save first.
    pub async fn saved_video_ids(&self, user_id: i32) -> Result<Vec<i32>, DbErr> {
        video_save::Entity::find()
            .select_only()
            .column(video_save::Column::VideoId)
            .filter(video_save::Column::UserId.eq(user_id))
            .order_by_desc(video_save::Column::CreatedAt)
            .into_tuple()
            .all(self.conn)
            .await
    }
}

/// `ON CONFLICT DO NOTHING` reports a skipped row as `RecordNotInserted` on some backends.
pub(crate) fn ignore_not_inserted(result: Result<u64, DbErr>) -> Result<u64, DbErr> {
    match result {
        Ok(n) => Ok(n),
        Err(DbErr::RecordNotInserted) => Ok(0),
        Err(e) => Err(e),
    }
}
