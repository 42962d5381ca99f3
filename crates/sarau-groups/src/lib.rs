//! sarau-groups - Community group membership, roles and moderation
//!
//! Users create groups, join or leave them, and request access to private ones.
//! Every group has exactly one creator; the creator appoints moderators, and
//! moderators settle join requests and remove disruptive members.
//!
//! # Architecture
//!
//! - [`GroupService`] owns the group lifecycle and privacy
//! - [`MembershipService`] handles join/leave and role management
//! - [`RequestService`] files and resolves join requests for private groups
//! - [`policy::permits`] is the single authorization table all of them consult
//!
//! Each service is generic over a [`sarau_storage::Store`]; multi-row effects such as
//! "add member and bump the counter" are one unit of work in the store, so a failure
//! never leaves `member_count` out of step with the membership rows.
//!
//! [`Groups`] bundles the three services behind one handle.

use std::sync::Arc;

use sarau_storage::{
    Group, GroupId, GroupMember, GroupRole, JoinRequest, JoinRequestId, Store,
    UpdateGroupParams, UserId,
};

mod config;
mod error;
mod groups;
mod lookup;
mod membership;
pub mod policy;
mod requests;

pub use config::{ConfigError, GroupsConfig};
pub use error::{GroupsError, Result};
pub use groups::{GroupService, NewGroup};
pub use membership::{MembershipOutcome, MembershipService, MembershipStatus};
pub use requests::{RequestService, Resolution, Resolved};

/// All group operations over one store.
pub struct Groups<S: Store> {
    pub groups: GroupService<S>,
    pub membership: MembershipService<S>,
    pub requests: RequestService<S>,
}

impl<S: Store> Clone for Groups<S> {
    fn clone(&self) -> Self {
        Self {
            groups: self.groups.clone(),
            membership: self.membership.clone(),
            requests: self.requests.clone(),
        }
    }
}

impl<S: Store> Groups<S> {
    pub fn new(store: Arc<S>, config: GroupsConfig) -> Self {
        Self {
            groups: GroupService::new(store.clone(), config),
            membership: MembershipService::new(store.clone()),
            requests: RequestService::new(store),
        }
    }

    pub async fn create_group(&self, creator_id: &UserId, new: NewGroup) -> Result<Group> {
        self.groups.create_group(creator_id, new).await
    }

    pub async fn get_group(&self, group_id: &GroupId) -> Result<Group> {
        self.groups.get_group(group_id).await
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>> {
        self.groups.list_groups().await
    }

    pub async fn list_user_groups(&self, user_id: &UserId) -> Result<Vec<Group>> {
        self.groups.list_user_groups(user_id).await
    }

    pub async fn update_group(
        &self,
        group_id: &GroupId,
        actor_id: &UserId,
        changes: UpdateGroupParams,
    ) -> Result<Group> {
        self.groups.update_group(group_id, actor_id, changes).await
    }

    pub async fn delete_group(&self, group_id: &GroupId, actor_id: &UserId) -> Result<()> {
        self.groups.delete_group(group_id, actor_id).await
    }

    pub async fn recount_members(&self, group_id: &GroupId, actor_id: &UserId) -> Result<i64> {
        self.groups.recount_members(group_id, actor_id).await
    }

    pub async fn join(&self, group_id: &GroupId, user_id: &UserId) -> Result<MembershipOutcome> {
        self.membership.join(group_id, user_id).await
    }

    pub async fn leave(&self, group_id: &GroupId, user_id: &UserId) -> Result<MembershipOutcome> {
        self.membership.leave(group_id, user_id).await
    }

    pub async fn toggle_membership(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<MembershipOutcome> {
        self.membership.toggle_membership(group_id, user_id).await
    }

    pub async fn list_members(&self, group_id: &GroupId) -> Result<Vec<GroupMember>> {
        self.membership.list_members(group_id).await
    }

    pub async fn membership_status(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<MembershipStatus> {
        self.membership.membership_status(group_id, user_id).await
    }

    pub async fn change_member_role(
        &self,
        group_id: &GroupId,
        actor_id: &UserId,
        target_id: &UserId,
        new_role: GroupRole,
    ) -> Result<GroupMember> {
        self.membership
            .change_role(group_id, actor_id, target_id, new_role)
            .await
    }

    pub async fn remove_member(
        &self,
        group_id: &GroupId,
        actor_id: &UserId,
        target_id: &UserId,
    ) -> Result<i64> {
        self.membership
            .remove_member(group_id, actor_id, target_id)
            .await
    }

    pub async fn request_to_join(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<JoinRequest> {
        self.requests.create_request(group_id, user_id).await
    }

    pub async fn list_pending_requests(
        &self,
        group_id: &GroupId,
        actor_id: &UserId,
    ) -> Result<Vec<JoinRequest>> {
        self.requests.list_pending(group_id, actor_id).await
    }

    pub async fn resolve_request(
        &self,
        group_id: &GroupId,
        request_id: &JoinRequestId,
        resolution: Resolution,
        actor_id: &UserId,
    ) -> Result<Resolved> {
        self.requests
            .resolve(group_id, request_id, resolution, actor_id)
            .await
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use chrono::Utc;
    use sarau_storage::{
        Group, GroupId, GroupMember, GroupRole, JoinRequest, JoinRequestId, JoinRequestStatus,
        UserId,
    };

    pub fn group(id: GroupId, is_private: bool) -> Group {
        let now = Utc::now();
        Group {
            id,
            name: "Poetas".into(),
            description: None,
            creator_id: UserId::new(),
            image_url: None,
            cover_url: None,
            is_private,
            member_count: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn member(group_id: GroupId, user_id: UserId, role: GroupRole) -> GroupMember {
        GroupMember {
            group_id,
            user_id,
            role,
            created_at: Utc::now(),
        }
    }

    pub fn pending_request(id: JoinRequestId, group_id: GroupId, user_id: UserId) -> JoinRequest {
        JoinRequest {
            id,
            group_id,
            user_id,
            status: JoinRequestStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
        }
    }
}
