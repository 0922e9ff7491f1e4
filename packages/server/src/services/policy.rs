//! Who may delete a piece of content.

use crate::models::role::Role;

/// The caller, as far as authorization is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i32,
    pub role: Role,
}

/// The item being deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRef {
    pub owner_id: i32,
    pub is_reply: bool,
}

/// Decide whether `actor` may delete `item`.
///
/// Allowed when the actor authored the item, is an admin, or the item is a
/// reply and the actor authored its parent video (`parent_owner`). The parent
/// rule reaches exactly one level down and never grants reply authors rights
/// over the parent. `parent_owner` is ignored for root videos and treated as
/// unknown when `None`.
pub fn may_delete(actor: &Actor, item: &ContentRef, parent_owner: Option<i32>) -> bool {
    if item.owner_id == actor.id || actor.role == Role::Admin {
        return true;
    }
    item.is_reply && parent_owner == Some(actor.id)
}
