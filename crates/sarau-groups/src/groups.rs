//! Group lifecycle: create, read, update, delete.

use std::sync::Arc;

use sarau_storage::{CreateGroupParams, Group, GroupId, Store, UpdateGroupParams, UserId};
use tracing::{debug, info, warn};

use crate::config::GroupsConfig;
use crate::error::{GroupsError, Result};
use crate::lookup::{load_group, require_role};
use crate::policy::{permits, Action};

/// Input for [`GroupService::create_group`].
#[derive(Clone, Debug, Default)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub cover_url: Option<String>,
    pub is_private: bool,
}

impl NewGroup {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Creates and administers groups.
pub struct GroupService<S: Store> {
    store: Arc<S>,
    config: GroupsConfig,
}

impl<S: Store> Clone for GroupService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: Store> GroupService<S> {
    pub fn new(store: Arc<S>, config: GroupsConfig) -> Self {
        Self { store, config }
    }

    /// Create a group owned by `creator_id`.
    ///
    /// The group and the creator's membership are stored in one unit of work, so the
    /// new group starts with `member_count == 1`.
    pub async fn create_group(&self, creator_id: &UserId, new: NewGroup) -> Result<Group> {
        if creator_id.0.is_nil() {
            return Err(GroupsError::Validation("creator is required".into()));
        }
        let name = self.validate_name(&new.name)?;
        let description = normalize(new.description);
        self.validate_description(description.as_deref())?;

        let group = self
            .store
            .create_group(&CreateGroupParams {
                name,
                description,
                creator_id: *creator_id,
                image_url: normalize(new.image_url),
                cover_url: normalize(new.cover_url),
                is_private: new.is_private,
            })
            .await?;

        info!(
            group_id = %group.id,
            creator_id = %creator_id,
            is_private = group.is_private,
            "Group created"
        );
        Ok(group)
    }

    pub async fn get_group(&self, group_id: &GroupId) -> Result<Group> {
        load_group(self.store.as_ref(), group_id).await
    }

    /// All groups, newest first.
    pub async fn list_groups(&self) -> Result<Vec<Group>> {
        Ok(self.store.list_groups().await?)
    }

    /// Groups `user_id` belongs to, in any role, newest first.
    pub async fn list_user_groups(&self, user_id: &UserId) -> Result<Vec<Group>> {
        Ok(self.store.list_user_groups(user_id).await?)
    }

    /// Update descriptive fields (moderator or creator) and privacy (creator only).
    ///
    /// Setting `is_private` to its current value does not require the creator role.
    pub async fn update_group(
        &self,
        group_id: &GroupId,
        actor_id: &UserId,
        mut changes: UpdateGroupParams,
    ) -> Result<Group> {
        if let Some(name) = changes.name.take() {
            changes.name = Some(self.validate_name(&name)?);
        }
        if let Some(description) = changes.description.take() {
            let description = normalize(description);
            self.validate_description(description.as_deref())?;
            changes.description = Some(description);
        }
        changes.image_url = changes.image_url.map(normalize);
        changes.cover_url = changes.cover_url.map(normalize);

        let group = load_group(self.store.as_ref(), group_id).await?;
        let role = require_role(self.store.as_ref(), group_id, actor_id).await?;

        if !permits(role, Action::UpdateGroup, None) {
            warn!(group_id = %group_id, actor_id = %actor_id, %role, "Group update denied");
            return Err(GroupsError::Permission(
                "only moderators and the creator can edit the group".into(),
            ));
        }
        if changes.is_private == Some(group.is_private) {
            changes.is_private = None;
        }
        if changes.is_private.is_some() && !permits(role, Action::UpdatePrivacy, None) {
            warn!(group_id = %group_id, actor_id = %actor_id, %role, "Privacy change denied");
            return Err(GroupsError::Permission(
                "only the creator can change group privacy".into(),
            ));
        }

        if changes.is_empty() {
            debug!(group_id = %group_id, "Group update has no changes");
            return Ok(group);
        }

        let updated = self
            .store
            .update_group(group_id, &changes)
            .await
            .map_err(GroupsError::not_found("group"))?;

        info!(group_id = %group_id, actor_id = %actor_id, "Group updated");
        Ok(updated)
    }

    /// Delete a group with all of its memberships and join requests. Creator only.
    pub async fn delete_group(&self, group_id: &GroupId, actor_id: &UserId) -> Result<()> {
        load_group(self.store.as_ref(), group_id).await?;
        let role = require_role(self.store.as_ref(), group_id, actor_id).await?;
        if !permits(role, Action::DeleteGroup, None) {
            warn!(group_id = %group_id, actor_id = %actor_id, %role, "Group delete denied");
            return Err(GroupsError::Permission(
                "only the creator can delete the group".into(),
            ));
        }

        self.store
            .delete_group(group_id)
            .await
            .map_err(GroupsError::not_found("group"))?;

        info!(group_id = %group_id, actor_id = %actor_id, "Group deleted");
        Ok(())
    }

    /// Reset the stored member counter to the number of membership rows. Creator only.
    pub async fn recount_members(&self, group_id: &GroupId, actor_id: &UserId) -> Result<i64> {
        let group = load_group(self.store.as_ref(), group_id).await?;
        let role = require_role(self.store.as_ref(), group_id, actor_id).await?;
        if !permits(role, Action::RecountMembers, None) {
            return Err(GroupsError::Permission(
                "only the creator can recount members".into(),
            ));
        }

        let count = self
            .store
            .recount_members(group_id)
            .await
            .map_err(GroupsError::not_found("group"))?;

        if count != group.member_count {
            warn!(
                group_id = %group_id,
                stored = group.member_count,
                actual = count,
                "Member counter drift repaired"
            );
        }
        Ok(count)
    }

    fn validate_name(&self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GroupsError::Validation("group name is required".into()));
        }
        if name.chars().count() > self.config.name_max_len {
            return Err(GroupsError::Validation(format!(
                "group name exceeds {} characters",
                self.config.name_max_len
            )));
        }
        Ok(name.to_string())
    }

    fn validate_description(&self, description: Option<&str>) -> Result<()> {
        match description {
            Some(d) if d.chars().count() > self.config.description_max_len => {
                Err(GroupsError::Validation(format!(
                    "description exceeds {} characters",
                    self.config.description_max_len
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Blank optional text is stored as absent.
fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
