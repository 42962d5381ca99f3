//! Join requests for private groups and their moderation.

use std::str::FromStr;
use std::sync::Arc;

use sarau_storage::{GroupId, JoinRequest, JoinRequestId, Store, StoreError, UserId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{GroupsError, Result};
use crate::lookup::{current_role, load_group, require_role};
use crate::policy::{permits, Action};

/// How a moderator settles a pending request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Approve,
    Reject,
}

impl FromStr for Resolution {
    type Err = GroupsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "approve" => Ok(Resolution::Approve),
            "reject" => Ok(Resolution::Reject),
            other => Err(GroupsError::Validation(format!(
                "unknown resolution '{other}', expected approve or reject"
            ))),
        }
    }
}

/// A resolved request together with the group's member count afterwards.
#[derive(Clone, Debug, Serialize)]
pub struct Resolved {
    pub request: JoinRequest,
    pub member_count: i64,
}

pub struct RequestService<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for RequestService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> RequestService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// File a pending request for `user_id` to join a private group.
    ///
    /// At most one request per (group, user) is pending: asking again returns the
    /// existing one instead of creating a second.
    pub async fn create_request(&self, group_id: &GroupId, user_id: &UserId) -> Result<JoinRequest> {
        let group = load_group(self.store.as_ref(), group_id).await?;
        if !group.is_private {
            return Err(GroupsError::Conflict(
                "group is open, join it directly".into(),
            ));
        }
        if current_role(self.store.as_ref(), group_id, user_id)
            .await?
            .is_some()
        {
            return Err(GroupsError::Conflict("already a member of this group".into()));
        }

        if let Some(existing) = self.find_pending(group_id, user_id).await? {
            debug!(group_id = %group_id, user_id = %user_id, request_id = %existing.id, "Join request already pending");
            return Ok(existing);
        }

        match self.store.create_join_request(group_id, user_id).await {
            Ok(request) => {
                info!(group_id = %group_id, user_id = %user_id, request_id = %request.id, "Join request created");
                Ok(request)
            }
            // Lost a race with a concurrent request from the same user.
            Err(StoreError::AlreadyExists) => self
                .find_pending(group_id, user_id)
                .await?
                .ok_or_else(|| GroupsError::Conflict("join request already resolved".into())),
            Err(e) => Err(GroupsError::not_found("group")(e)),
        }
    }

    /// The user's pending request for the group, if any.
    pub async fn find_pending(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<Option<JoinRequest>> {
        match self.store.get_pending_join_request(group_id, user_id).await {
            Ok(request) => Ok(Some(request)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Pending requests for a group, oldest first. Moderators and the creator only.
    pub async fn list_pending(
        &self,
        group_id: &GroupId,
        actor_id: &UserId,
    ) -> Result<Vec<JoinRequest>> {
        load_group(self.store.as_ref(), group_id).await?;
        let role = require_role(self.store.as_ref(), group_id, actor_id).await?;
        if !permits(role, Action::ViewRequests, None) {
            return Err(GroupsError::Permission(
                "only moderators and the creator can view join requests".into(),
            ));
        }

        Ok(self.store.list_pending_join_requests(group_id).await?)
    }

    /// Approve or reject a pending request.
    ///
    /// Approval adds the requester as a `member` and bumps the counter in the same unit of
    /// work; a requester who is already a member is not counted twice. A request that is
    /// no longer pending yields `Conflict`.
    pub async fn resolve(
        &self,
        group_id: &GroupId,
        request_id: &JoinRequestId,
        resolution: Resolution,
        actor_id: &UserId,
    ) -> Result<Resolved> {
        load_group(self.store.as_ref(), group_id).await?;
        let role = require_role(self.store.as_ref(), group_id, actor_id).await?;
        if !permits(role, Action::ResolveRequest, None) {
            warn!(group_id = %group_id, actor_id = %actor_id, %role, "Join request resolution denied");
            return Err(GroupsError::Permission(
                "only moderators and the creator can resolve join requests".into(),
            ));
        }

        let request = self
            .store
            .get_join_request(request_id)
            .await
            .map_err(GroupsError::not_found("join request"))?;
        if request.group_id != *group_id {
            return Err(GroupsError::NotFound("join request"));
        }
        if request.status.is_terminal() {
            return Err(already_resolved(&request));
        }

        let resolved = match resolution {
            Resolution::Approve => {
                let approved = self
                    .store
                    .approve_join_request(request_id, actor_id)
                    .await
                    .map_err(resolution_error)?;
                if !approved.member_added {
                    debug!(group_id = %group_id, user_id = %approved.request.user_id, "Approved requester was already a member");
                }
                Resolved {
                    request: approved.request,
                    member_count: approved.member_count,
                }
            }
            Resolution::Reject => {
                let request = self
                    .store
                    .reject_join_request(request_id, actor_id)
                    .await
                    .map_err(resolution_error)?;
                let group = load_group(self.store.as_ref(), group_id).await?;
                Resolved {
                    request,
                    member_count: group.member_count,
                }
            }
        };

        info!(
            group_id = %group_id,
            request_id = %request_id,
            user_id = %resolved.request.user_id,
            actor_id = %actor_id,
            status = %resolved.request.status,
            "Join request resolved"
        );
        Ok(resolved)
    }
}

fn already_resolved(request: &JoinRequest) -> GroupsError {
    GroupsError::Conflict(format!("join request already {}", request.status))
}

fn resolution_error(e: StoreError) -> GroupsError {
    match e {
        StoreError::Conflict => GroupsError::Conflict("join request already resolved".into()),
        StoreError::NotFound => GroupsError::NotFound("join request"),
        e => GroupsError::Store(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{group, member, pending_request};
    use sarau_storage::{GroupRole, MockStore};

    #[test]
    fn parses_resolution() {
        assert_eq!("approve".parse::<Resolution>().unwrap(), Resolution::Approve);
        assert_eq!("reject".parse::<Resolution>().unwrap(), Resolution::Reject);
        assert!(matches!(
            "maybe".parse::<Resolution>(),
            Err(GroupsError::Validation(_))
        ));
    }

    fn store_with_actor(group_id: GroupId, role: GroupRole) -> MockStore {
        let mut store = MockStore::new();
        store
            .expect_get_group()
            .returning(move |_| Ok(group(group_id, true)));
        store
            .expect_get_member()
            .returning(move |g, u| Ok(member(*g, *u, role)));
        store
    }

    #[tokio::test]
    async fn member_cannot_list_requests() {
        let group_id = GroupId::new();
        let svc = RequestService::new(Arc::new(store_with_actor(group_id, GroupRole::Member)));

        let err = svc.list_pending(&group_id, &UserId::new()).await.unwrap_err();
        assert!(matches!(err, GroupsError::Permission(_)));
    }

    #[tokio::test]
    async fn concurrent_resolution_is_conflict() {
        let group_id = GroupId::new();
        let mut store = store_with_actor(group_id, GroupRole::Moderator);
        store
            .expect_get_join_request()
            .returning(move |id| Ok(pending_request(*id, group_id, UserId::new())));
        store
            .expect_approve_join_request()
            .returning(|_, _| Err(StoreError::Conflict));

        let svc = RequestService::new(Arc::new(store));
        let err = svc
            .resolve(&group_id, &JoinRequestId::new(), Resolution::Approve, &UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GroupsError::Conflict(_)));
    }

    #[tokio::test]
    async fn request_from_another_group_is_not_found() {
        let group_id = GroupId::new();
        let mut store = store_with_actor(group_id, GroupRole::Creator);
        store
            .expect_get_join_request()
            .returning(|id| Ok(pending_request(*id, GroupId::new(), UserId::new())));

        let svc = RequestService::new(Arc::new(store));
        let err = svc
            .resolve(&group_id, &JoinRequestId::new(), Resolution::Reject, &UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GroupsError::NotFound("join request")));
    }

    #[tokio::test]
    async fn backend_failure_while_filing_propagates() {
        let group_id = GroupId::new();
        let mut store = MockStore::new();
        store
            .expect_get_group()
            .returning(move |_| Ok(group(group_id, true)));
        store
            .expect_get_member()
            .returning(|_, _| Err(StoreError::NotFound));
        store
            .expect_get_pending_join_request()
            .returning(|_, _| Err(StoreError::NotFound));
        store
            .expect_create_join_request()
            .returning(|_, _| Err(StoreError::Backend("locked".into())));

        let svc = RequestService::new(Arc::new(store));
        let err = svc.create_request(&group_id, &UserId::new()).await.unwrap_err();
        assert!(matches!(err, GroupsError::Store(StoreError::Backend(_))));
    }
}
