//! Store reads shared by the services.

use sarau_storage::{Group, GroupId, GroupRole, Store, StoreError, UserId};

use crate::error::{GroupsError, Result};

pub(crate) async fn load_group<S: Store>(store: &S, group_id: &GroupId) -> Result<Group> {
    store
        .get_group(group_id)
        .await
        .map_err(GroupsError::not_found("group"))
}

/// The user's role in the group, or `None` when they hold no membership row.
pub(crate) async fn current_role<S: Store>(
    store: &S,
    group_id: &GroupId,
    user_id: &UserId,
) -> Result<Option<GroupRole>> {
    match store.get_member(group_id, user_id).await {
        Ok(member) => Ok(Some(member.role)),
        Err(StoreError::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Like [`current_role`], but non-members are refused.
pub(crate) async fn require_role<S: Store>(
    store: &S,
    group_id: &GroupId,
    user_id: &UserId,
) -> Result<GroupRole> {
    current_role(store, group_id, user_id)
        .await?
        .ok_or_else(|| GroupsError::Permission("not a member of this group".into()))
}
