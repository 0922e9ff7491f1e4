//! Read side for videos: loads authors and engagement counts in bulk and
//! assembles API responses.

use std::collections::HashMap;

use sea_orm::prelude::Expr;
use sea_orm::*;

use crate::entity::{user, video, video_like, video_save};
use crate::models::user::UserSummary;
use crate::models::video::{VideoCounts, VideoResponse};

/// Upper bound on ids bound into a single `IN (...)` list. Keeps every
/// batch well under the bind-parameter limits of SQLite and Postgres.
pub(crate) const IN_CHUNK: usize = 500;

/// Like count of the outer `video` row.
const LIKE_COUNT_SQL: &str =
    r#"(SELECT COUNT(*) FROM "video_like" WHERE "video_like"."video_id" = "video"."id")"#;

pub struct VideoCatalog<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> VideoCatalog<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Active public root videos ranked by views, then likes, then recency.
    pub async fn trending(&self, limit: u64) -> Result<Vec<video::Model>, DbErr> {
        video::Entity::find()
            .filter(video::Column::IsReply.eq(false))
            .filter(video::Column::IsActive.eq(true))
            .filter(video::Column::IsPublic.eq(true))
            .order_by_desc(video::Column::Views)
            .order_by(Expr::cust(LIKE_COUNT_SQL), Order::Desc)
            .order_by_desc(video::Column::CreatedAt)
            .order_by_desc(video::Column::Id)
            .limit(limit)
            .all(self.conn)
            .await
    }

    /// Active replies of the given root videos, oldest first within each root.
    async fn active_replies(&self, root_ids: &[i32]) -> Result<Vec<video::Model>, DbErr> {
        let mut replies = Vec::new();
        for chunk in root_ids.chunks(IN_CHUNK) {
            let batch = video::Entity::find()
                .filter(video::Column::ParentVideoId.is_in(chunk.to_vec()))
                .filter(video::Column::IsActive.eq(true))
                .order_by_asc(video::Column::CreatedAt)
                .order_by_asc(video::Column::Id)
                .all(self.conn)
                .await?;
            replies.extend(batch);
        }
        Ok(replies)
    }

    /// Like, save, and active-reply counts for each id.
    pub async fn counts(&self, ids: &[i32]) -> Result<HashMap<i32, VideoCounts>, DbErr> {
        let mut counts: HashMap<i32, VideoCounts> = HashMap::new();

        for chunk in ids.chunks(IN_CHUNK) {
            let liked: Vec<(i32, i64)> = video_like::Entity::find()
                .select_only()
                .column(video_like::Column::VideoId)
                .column_as(video_like::Column::UserId.count(), "likes")
                .filter(video_like::Column::VideoId.is_in(chunk.to_vec()))
                .group_by(video_like::Column::VideoId)
                .into_tuple()
                .all(self.conn)
                .await?;
            for (id, n) in liked {
                counts.entry(id).or_default().likes = u64::try_from(n).unwrap_or(0);
            }

            let saved: Vec<(i32, i64)> = video_save::Entity::find()
                .select_only()
                .column(video_save::Column::VideoId)
                .column_as(video_save::Column::UserId.count(), "saves")
                .filter(video_save::Column::VideoId.is_in(chunk.to_vec()))
                .group_by(video_save::Column::VideoId)
                .into_tuple()
                .all(self.conn)
                .await?;
            for (id, n) in saved {
                counts.entry(id).or_default().saves = u64::try_from(n).unwrap_or(0);
            }

            let replies: Vec<(Option<i32>, i64)> = video::Entity::find()
                .select_only()
                .column(video::Column::ParentVideoId)
                .column_as(video::Column::Id.count(), "replies")
                .filter(video::Column::ParentVideoId.is_in(chunk.to_vec()))
                .filter(video::Column::IsActive.eq(true))
                .group_by(video::Column::ParentVideoId)
                .into_tuple()
                .all(self.conn)
                .await?;
            for (id, n) in replies {
                if let Some(id) = id {
                    counts.entry(id).or_default().replies = u64::try_from(n).unwrap_or(0);
                }
            }
        }

        Ok(counts)
    }

    async fn authors(&self, user_ids: &[i32]) -> Result<HashMap<i32, UserSummary>, DbErr> {
        let mut authors = HashMap::new();
        for chunk in user_ids.chunks(IN_CHUNK) {
            let users = user::Entity::find()
                .filter(user::Column::Id.is_in(chunk.to_vec()))
                .all(self.conn)
                .await?;
            authors.extend(users.iter().map(|u| (u.id, UserSummary::from(u))));
        }
        Ok(authors)
    }

    /// Build responses in input order. Root videos get their active replies
    /// embedded when `embed_replies` is set.
    pub async fn present(
        &self,
        videos: Vec<video::Model>,
        embed_replies: bool,
    ) -> Result<Vec<VideoResponse>, DbErr> {
        let replies = if embed_replies {
            let root_ids: Vec<i32> = videos.iter().filter(|v| !v.is_reply).map(|v| v.id).collect();
            self.active_replies(&root_ids).await?
        } else {
            Vec::new()
        };

        let mut ids: Vec<i32> = videos.iter().chain(&replies).map(|v| v.id).collect();
        ids.sort_unstable();
        ids.dedup();
        let counts = self.counts(&ids).await?;

        let mut author_ids: Vec<i32> = videos.iter().chain(&replies).map(|v| v.user_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors = self.authors(&author_ids).await?;

        let build = |m: video::Model| {
            let c = counts.get(&m.id).copied().unwrap_or_default();
            let author = authors.get(&m.user_id).cloned();
            VideoResponse::build(m, author, c)
        };

        let mut replies_by_parent: HashMap<i32, Vec<VideoResponse>> = HashMap::new();
        for reply in replies {
            if let Some(parent) = reply.parent_video_id {
                replies_by_parent.entry(parent).or_default().push(build(reply));
            }
        }

        Ok(videos
            .into_iter()
            .map(|m| {
                let id = m.id;
                let is_root = !m.is_reply;
                let mut response = build(m);
                if embed_replies && is_root {
                    response.replies = Some(replies_by_parent.remove(&id).unwrap_or_default());
                }
                response
            })
            .collect())
    }

    pub async fn present_one(&self, video: video::Model) -> Result<VideoResponse, DbErr> {
        let mut out = self.present(vec![video], true).await?;
        out.pop()
            .ok_or_else(|| DbErr::Custom("presenting a single video produced no response".into()))
    }

    /// Load videos by id and keep the order of `ids`. Missing or inactive ids are skipped.
    pub async fn by_ids_in_order(&self, ids: &[i32]) -> Result<Vec<video::Model>, DbErr> {
        let mut found = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(IN_CHUNK) {
            let batch = video::Entity::find()
                .filter(video::Column::Id.is_in(chunk.to_vec()))
                .filter(video::Column::IsActive.eq(true))
                .all(self.conn)
                .await?;
            found.extend(batch);
        }

        let position: HashMap<i32, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        found.sort_by_key(|v| position.get(&v.id).copied().unwrap_or(usize::MAX));
        Ok(found)
    }
}
