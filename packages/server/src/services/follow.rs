use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

use crate::entity::{follow, user};
use crate::services::catalog::IN_CHUNK;
use crate::services::engagement::ignore_not_inserted;

/// The follow graph. One row per directed edge; a user's `following` and
/// the target's `followers` are two reads of the same row, so a follow is a
/// single write and the two sides cannot drift apart.
pub struct FollowService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> FollowService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Returns `false` if the edge already existed.
    ///
    /// Self-follow is rejected by callers, not here.
    pub async fn follow(&self, follower_id: i32, followee_id: i32) -> Result<bool, DbErr> {
        let model = follow::ActiveModel {
            follower_id: Set(follower_id),
            followee_id: Set(followee_id),
            created_at: Set(Utc::now()),
        };
        let result = follow::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([follow::Column::FollowerId, follow::Column::FolloweeId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await;
        Ok(ignore_not_inserted(result)? > 0)
    }

    /// Returns `false` if there was no edge to remove.
    pub async fn unfollow(&self, follower_id: i32, followee_id: i32) -> Result<bool, DbErr> {
        let result = follow::Entity::delete_by_id((follower_id, followee_id))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn followers_count(&self, user_id: i32) -> Result<u64, DbErr> {
        follow::Entity::find()
            .filter(follow::Column::FolloweeId.eq(user_id))
            .count(self.conn)
            .await
    }

    pub async fn following_count(&self, user_id: i32) -> Result<u64, DbErr> {
        follow::Entity::find()
            .filter(follow::Column::FollowerId.eq(user_id))
            .count(self.conn)
            .await
    }

    /// Users following `user_id`, most recent first.
    pub async fn followers(&self, user_id: i32) -> Result<Vec<user::Model>, DbErr> {
        let ids: Vec<i32> = follow::Entity::find()
            .select_only()
            .column(follow::Column::FollowerId)
            .filter(follow::Column::FolloweeId.eq(user_id))
            .order_by_desc(follow::Column::CreatedAt)
            .into_tuple()
            .all(self.conn)
            .await?;
        self.users_in_order(ids).await
    }

    /// Users `user_id` follows, most recent first.
    pub async fn following(&self, user_id: i32) -> Result<Vec<user::Model>, DbErr> {
        let ids: Vec<i32> = follow::Entity::find()
            .select_only()
            .column(follow::Column::FolloweeId)
            .filter(follow::Column::FollowerId.eq(user_id))
            .order_by_desc(follow::Column::CreatedAt)
            .into_tuple()
            .all(self.conn)
            .await?;
        self.users_in_order(ids).await
    }

    async fn users_in_order(&self, ids: Vec<i32>) -> Result<Vec<user::Model>, DbErr> {
        let mut users = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(IN_CHUNK) {
            let batch = user::Entity::find()
                .filter(user::Column::Id.is_in(chunk.to_vec()))
                .all(self.conn)
                .await?;
            users.extend(batch);
        }

        let position: HashMap<i32, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        users.sort_by_key(|u| position.get(&u.id).copied().unwrap_or(usize::MAX));
        Ok(users)
    }
}
