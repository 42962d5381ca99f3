//! Joining, leaving and role management.

use std::sync::Arc;

use sarau_storage::{GroupId, GroupMember, GroupRole, JoinRequest, Store, StoreError, UserId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{GroupsError, Result};
use crate::lookup::{current_role, load_group, require_role};
use crate::policy::{permits, Action};
use crate::requests::RequestService;

/// Where a user stands after a join, leave or toggle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MembershipOutcome {
    /// The user holds `role` in the group.
    Member { role: GroupRole, member_count: i64 },
    /// The group is private; the user's request awaits a moderator.
    Requested {
        request: JoinRequest,
        member_count: i64,
    },
    /// The user is not a member.
    Left { member_count: i64 },
}

impl MembershipOutcome {
    pub fn is_member(&self) -> bool {
        matches!(self, MembershipOutcome::Member { .. })
    }

    pub fn member_count(&self) -> i64 {
        match self {
            MembershipOutcome::Member { member_count, .. }
            | MembershipOutcome::Requested { member_count, .. }
            | MembershipOutcome::Left { member_count } => *member_count,
        }
    }
}

/// A user's relationship to one group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MembershipStatus {
    pub role: Option<GroupRole>,
    pub pending_request: Option<JoinRequest>,
}

pub struct MembershipService<S: Store> {
    store: Arc<S>,
    requests: RequestService<S>,
}

impl<S: Store> Clone for MembershipService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            requests: self.requests.clone(),
        }
    }
}

impl<S: Store> MembershipService<S> {
    pub fn new(store: Arc<S>) -> Self {
        let requests = RequestService::new(store.clone());
        Self { store, requests }
    }

    /// Join an open group, or file a join request for a private one.
    ///
    /// Joining twice is harmless: an existing member gets their current role back and the
    /// counter is untouched.
    pub async fn join(&self, group_id: &GroupId, user_id: &UserId) -> Result<MembershipOutcome> {
        let group = load_group(self.store.as_ref(), group_id).await?;

        if let Some(role) = current_role(self.store.as_ref(), group_id, user_id).await? {
            debug!(group_id = %group_id, user_id = %user_id, "Already a member");
            return Ok(MembershipOutcome::Member {
                role,
                member_count: group.member_count,
            });
        }

        if group.is_private {
            let request = self.requests.create_request(group_id, user_id).await?;
            return Ok(MembershipOutcome::Requested {
                request,
                member_count: group.member_count,
            });
        }

        match self
            .store
            .add_member(group_id, user_id, GroupRole::Member)
            .await
        {
            Ok(member_count) => {
                info!(group_id = %group_id, user_id = %user_id, member_count, "Member joined");
                Ok(MembershipOutcome::Member {
                    role: GroupRole::Member,
                    member_count,
                })
            }
            // A concurrent join for the same user won; report the settled state.
            Err(StoreError::AlreadyExists) => {
                debug!(group_id = %group_id, user_id = %user_id, "Concurrent join absorbed");
                self.settled(group_id, user_id).await
            }
            Err(e) => Err(GroupsError::not_found("group")(e)),
        }
    }

    /// Leave a group. Leaving a group one is not in is a no-op.
    ///
    /// The creator cannot leave; the group has to be deleted instead.
    pub async fn leave(&self, group_id: &GroupId, user_id: &UserId) -> Result<MembershipOutcome> {
        let group = load_group(self.store.as_ref(), group_id).await?;

        let Some(role) = current_role(self.store.as_ref(), group_id, user_id).await? else {
            debug!(group_id = %group_id, user_id = %user_id, "Leave ignored, not a member");
            return Ok(MembershipOutcome::Left {
                member_count: group.member_count,
            });
        };
        if !permits(role, Action::Leave, None) {
            return Err(GroupsError::Conflict(
                "the creator cannot leave the group, delete it instead".into(),
            ));
        }

        match self.store.remove_member(group_id, user_id).await {
            Ok(member_count) => {
                info!(group_id = %group_id, user_id = %user_id, member_count, "Member left");
                Ok(MembershipOutcome::Left { member_count })
            }
            // Removed concurrently: the user is out either way.
            Err(StoreError::NotFound) => {
                let group = load_group(self.store.as_ref(), group_id).await?;
                Ok(MembershipOutcome::Left {
                    member_count: group.member_count,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Leave if a member, otherwise join (or request to join).
    pub async fn toggle_membership(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<MembershipOutcome> {
        match current_role(self.store.as_ref(), group_id, user_id).await? {
            Some(_) => self.leave(group_id, user_id).await,
            None => self.join(group_id, user_id).await,
        }
    }

    /// Promote a member to moderator or demote a moderator. Creator only.
    pub async fn change_role(
        &self,
        group_id: &GroupId,
        actor_id: &UserId,
        target_id: &UserId,
        new_role: GroupRole,
    ) -> Result<GroupMember> {
        load_group(self.store.as_ref(), group_id).await?;
        let actor_role = require_role(self.store.as_ref(), group_id, actor_id).await?;
        let target = self.target(group_id, target_id).await?;

        if target.role == GroupRole::Creator && actor_id == target_id {
            return Err(GroupsError::Conflict(
                "the creator cannot change their own role".into(),
            ));
        }
        if !permits(actor_role, Action::ChangeRole, Some(target.role)) {
            warn!(
                group_id = %group_id,
                actor_id = %actor_id,
                target_id = %target_id,
                %actor_role,
                "Role change denied"
            );
            return Err(GroupsError::Permission(
                "only the creator can change member roles".into(),
            ));
        }
        if new_role == GroupRole::Creator {
            return Err(GroupsError::Conflict(
                "a group has exactly one creator".into(),
            ));
        }
        if target.role == new_role {
            debug!(group_id = %group_id, target_id = %target_id, %new_role, "Role unchanged");
            return Ok(target);
        }

        self.store
            .update_member_role(group_id, target_id, new_role)
            .await
            .map_err(GroupsError::not_found("member"))?;

        info!(
            group_id = %group_id,
            actor_id = %actor_id,
            target_id = %target_id,
            from = %target.role,
            to = %new_role,
            "Member role changed"
        );
        Ok(GroupMember {
            role: new_role,
            ..target
        })
    }

    /// Remove another member. Returns the member count afterwards.
    ///
    /// Moderators may remove plain members; the creator may remove anyone but themself.
    pub async fn remove_member(
        &self,
        group_id: &GroupId,
        actor_id: &UserId,
        target_id: &UserId,
    ) -> Result<i64> {
        load_group(self.store.as_ref(), group_id).await?;
        let actor_role = require_role(self.store.as_ref(), group_id, actor_id).await?;
        let target = self.target(group_id, target_id).await?;

        if target.role == GroupRole::Creator && actor_id == target_id {
            return Err(GroupsError::Conflict("the creator cannot be removed".into()));
        }
        if !permits(actor_role, Action::RemoveMember, Some(target.role)) {
            warn!(
                group_id = %group_id,
                actor_id = %actor_id,
                target_id = %target_id,
                %actor_role,
                target_role = %target.role,
                "Member removal denied"
            );
            return Err(GroupsError::Permission(format!(
                "a {actor_role} cannot remove a {}",
                target.role
            )));
        }

        let member_count = self
            .store
            .remove_member(group_id, target_id)
            .await
            .map_err(GroupsError::not_found("member"))?;

        info!(
            group_id = %group_id,
            actor_id = %actor_id,
            target_id = %target_id,
            member_count,
            "Member removed"
        );
        Ok(member_count)
    }

    /// Members of a group: creator, then moderators, then members, each in join order.
    pub async fn list_members(&self, group_id: &GroupId) -> Result<Vec<GroupMember>> {
        load_group(self.store.as_ref(), group_id).await?;
        Ok(self.store.list_members(group_id).await?)
    }

    pub async fn membership_status(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<MembershipStatus> {
        load_group(self.store.as_ref(), group_id).await?;
        let role = current_role(self.store.as_ref(), group_id, user_id).await?;
        let pending_request = match role {
            Some(_) => None,
            None => self.requests.find_pending(group_id, user_id).await?,
        };
        Ok(MembershipStatus {
            role,
            pending_request,
        })
    }

    async fn target(&self, group_id: &GroupId, target_id: &UserId) -> Result<GroupMember> {
        self.store
            .get_member(group_id, target_id)
            .await
            .map_err(GroupsError::not_found("member"))
    }

    async fn settled(&self, group_id: &GroupId, user_id: &UserId) -> Result<MembershipOutcome> {
        let group = load_group(self.store.as_ref(), group_id).await?;
        let role = current_role(self.store.as_ref(), group_id, user_id)
            .await?
            .unwrap_or(GroupRole::Member);
        Ok(MembershipOutcome::Member {
            role,
            member_count: group.member_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{group, member};
    use sarau_storage::MockStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn duplicate_insert_is_absorbed() {
        let group_id = GroupId::new();
        let user_id = UserId::new();

        let mut store = MockStore::new();
        store.expect_get_group().returning(move |_| {
            let mut g = group(group_id, false);
            g.member_count = 2;
            Ok(g)
        });
        // First lookup: not yet a member. Second lookup, after the losing insert: member.
        let lookups = Arc::new(AtomicUsize::new(0));
        store.expect_get_member().times(2).returning(move |g, u| {
            if lookups.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(StoreError::NotFound)
            } else {
                Ok(member(*g, *u, GroupRole::Member))
            }
        });
        store
            .expect_add_member()
            .times(1)
            .returning(|_, _, _| Err(StoreError::AlreadyExists));

        let svc = MembershipService::new(Arc::new(store));
        let outcome = svc.join(&group_id, &user_id).await.unwrap();
        assert_eq!(
            outcome,
            MembershipOutcome::Member {
                role: GroupRole::Member,
                member_count: 2
            }
        );
    }

    #[tokio::test]
    async fn counter_failure_surfaces_as_store_error() {
        let group_id = GroupId::new();
        let mut store = MockStore::new();
        store
            .expect_get_group()
            .returning(move |_| Ok(group(group_id, false)));
        store
            .expect_get_member()
            .returning(|_, _| Err(StoreError::NotFound));
        store
            .expect_add_member()
            .returning(|_, _, _| Err(StoreError::Backend("counter update failed".into())));

        let svc = MembershipService::new(Arc::new(store));
        let err = svc.join(&group_id, &UserId::new()).await.unwrap_err();
        assert!(matches!(err, GroupsError::Store(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn creator_cannot_leave() {
        let group_id = GroupId::new();
        let mut store = MockStore::new();
        store
            .expect_get_group()
            .returning(move |_| Ok(group(group_id, false)));
        store
            .expect_get_member()
            .returning(|g, u| Ok(member(*g, *u, GroupRole::Creator)));
        store.expect_remove_member().never();

        let svc = MembershipService::new(Arc::new(store));
        let err = svc.leave(&group_id, &UserId::new()).await.unwrap_err();
        assert!(matches!(err, GroupsError::Conflict(_)));
    }

    #[test]
    fn outcome_serializes_tagged() {
        let json = serde_json::to_value(MembershipOutcome::Left { member_count: 3 }).unwrap();
        assert_eq!(json["outcome"], "left");
        assert_eq!(json["member_count"], 3);
    }
}
