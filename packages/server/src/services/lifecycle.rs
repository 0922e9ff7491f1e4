//! Deletion of videos, replies, and everything a user owns.
//!
//! Deletes are not transactional. Children are always removed before their
//! parent, so the database never holds a reply whose parent is gone; a crash
//! midway can leave some replies deleted and the root still present, which a
//! retried delete finishes. Media objects are removed best-effort before each
//! row, and a failed remote delete is logged and skipped. Two concurrent
//! cascades over the same video are harmless: whichever runs second finds the
//! rows already gone and deletes nothing.

use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{follow, user, video, video_like, video_save};
use crate::media::{MediaGateway, MediaLocator};

/// What a single delete request removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Replies removed as part of a root video cascade.
    pub replies_deleted: u64,
    /// Whether the requested row itself was still present and got removed.
    pub target_deleted: bool,
}

pub struct ContentLifecycle<'a, C: ConnectionTrait> {
    conn: &'a C,
    media: &'a MediaGateway,
}

impl<'a, C: ConnectionTrait> ContentLifecycle<'a, C> {
    pub fn new(conn: &'a C, media: &'a MediaGateway) -> Self {
        Self { conn, media }
    }

    /// Delete a video. Root videos cascade into their replies first.
    pub async fn delete(&self, target: &video::Model) -> Result<DeleteOutcome, DbErr> {
        if target.is_reply {
            let target_deleted = self.delete_single(target).await?;
            Ok(DeleteOutcome {
                replies_deleted: 0,
                target_deleted,
            })
        } else {
            self.cascade_delete(target).await
        }
    }

    /// Delete every reply of `root`, then `root` itself.
    #[instrument(skip(self, root), fields(video_id = root.id))]
    pub async fn cascade_delete(&self, root: &video::Model) -> Result<DeleteOutcome, DbErr> {
        let replies = video::Entity::find()
            .filter(video::Column::ParentVideoId.eq(root.id))
            .order_by_asc(video::Column::Id)
            .all(self.conn)
            .await?;

        let mut replies_deleted = 0u64;
        for reply in &replies {
            if self.delete_single(reply).await? {
                replies_deleted += 1;
            }
        }

        let target_deleted = self.delete_single(root).await?;

        info!(
            replies = replies.len(),
            replies_deleted, target_deleted, "Cascade delete finished"
        );

        Ok(DeleteOutcome {
            replies_deleted,
            target_deleted,
        })
    }

    /// Remove one video's media and row. Does not look at replies.
    ///
    /// Returns `false` if the row was already gone.
    async fn delete_single(&self, item: &video::Model) -> Result<bool, DbErr> {
        self.media
            .delete_optional(MediaLocator::from_parts(
                item.video_key.as_deref(),
                Some(&item.video_url),
            ))
            .await;
        self.media
            .delete_optional(MediaLocator::from_parts(
                item.thumbnail_key.as_deref(),
                item.thumbnail_url.as_deref(),
            ))
            .await;

        video_like::Entity::delete_many()
            .filter(video_like::Column::VideoId.eq(item.id))
            .exec(self.conn)
            .await?;
        video_save::Entity::delete_many()
            .filter(video_save::Column::VideoId.eq(item.id))
            .exec(self.conn)
            .await?;

        let result = video::Entity::delete_by_id(item.id)
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Delete a user together with everything they own or touch.
    ///
    /// Order: profile image, root videos (cascading), remaining replies,
    /// like/save/follow edges, then the user row. Returns the number of video
    /// rows removed, including other users' replies under the user's videos.
    #[instrument(skip(self, target), fields(user_id = target.id))]
    pub async fn delete_user(&self, target: &user::Model) -> Result<u64, DbErr> {
        self.media
            .delete_optional(MediaLocator::from_parts(
                target.profile_image_key.as_deref(),
                Some(&target.profile_image),
            ))
            .await;

        let roots = video::Entity::find()
            .filter(video::Column::UserId.eq(target.id))
            .filter(video::Column::IsReply.eq(false))
            .all(self.conn)
            .await?;

        let mut deleted = 0u64;
        for root in &roots {
            let outcome = self.cascade_delete(root).await?;
            deleted += outcome.replies_deleted + u64::from(outcome.target_deleted);
        }

        // Replies the user left on other people's videos. Their own replies
        // under their own roots are already gone.
        let replies = video::Entity::find()
            .filter(video::Column::UserId.eq(target.id))
            .filter(video::Column::IsReply.eq(true))
            .all(self.conn)
            .await?;
        for reply in &replies {
            if self.delete_single(reply).await? {
                deleted += 1;
            }
        }

        video_like::Entity::delete_many()
            .filter(video_like::Column::UserId.eq(target.id))
            .exec(self.conn)
            .await?;
        video_save::Entity::delete_many()
            .filter(video_save::Column::UserId.eq(target.id))
            .exec(self.conn)
            .await?;
        follow::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(follow::Column::FollowerId.eq(target.id))
                    .add(follow::Column::FolloweeId.eq(target.id)),
            )
            .exec(self.conn)
            .await?;

        user::Entity::delete_by_id(target.id)
            .exec(self.conn)
            .await?;

        info!(videos_deleted = deleted, "User deleted");
        Ok(deleted)
    }
}
