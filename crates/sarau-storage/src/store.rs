//! The Store trait that backends implement.

use crate::types::*;
use crate::StoreError;

/// The storage trait `sarau-groups` depends on.
///
/// Multi-row mutations (`create_group`, `delete_group`, `add_member`, `remove_member`,
/// `approve_join_request`) are **one unit of work each**: a backend must apply all of
/// their effects or none. Counter changes are atomic increments/decrements, never
/// read-then-write.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // ───────────────────────────────────── Groups ─────────────────────────────────────────

    /// Create a group with `member_count = 1` and its `creator` membership row.
    async fn create_group(&self, params: &CreateGroupParams) -> Result<Group, StoreError>;

    /// Get group by ID.
    async fn get_group(&self, group_id: &GroupId) -> Result<Group, StoreError>;

    /// List all groups, newest first.
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

    /// List the groups a user belongs to, newest first.
    async fn list_user_groups(&self, user_id: &UserId) -> Result<Vec<Group>, StoreError>;

    /// Apply a partial update and return the updated group.
    async fn update_group(
        &self,
        group_id: &GroupId,
        params: &UpdateGroupParams,
    ) -> Result<Group, StoreError>;

    /// Delete a group together with its members and join requests.
    async fn delete_group(&self, group_id: &GroupId) -> Result<(), StoreError>;

    /// Reset `member_count` to the live row count and return it.
    async fn recount_members(&self, group_id: &GroupId) -> Result<i64, StoreError>;

    // ───────────────────────────────────── Members ────────────────────────────────────────

    /// Get a membership row.
    async fn get_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<GroupMember, StoreError>;

    /// List members: creator first, then moderators, then members, each in join order.
    async fn list_members(&self, group_id: &GroupId) -> Result<Vec<GroupMember>, StoreError>;

    /// Insert a membership row and increment the group counter.
    /// Returns the new `member_count`; `AlreadyExists` if the pair is already a member.
    async fn add_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        role: GroupRole,
    ) -> Result<i64, StoreError>;

    /// Delete a non-creator membership row and decrement the counter (floored at zero).
    /// Returns the new `member_count`; `NotFound` if there was no removable row.
    async fn remove_member(&self, group_id: &GroupId, user_id: &UserId)
        -> Result<i64, StoreError>;

    /// Change the role of an existing membership row.
    async fn update_member_role(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        role: GroupRole,
    ) -> Result<(), StoreError>;

    /// Count live membership rows for a group.
    async fn count_members(&self, group_id: &GroupId) -> Result<i64, StoreError>;

    // ───────────────────────────────────── Join Requests ──────────────────────────────────

    /// Create a pending join request; `AlreadyExists` if one is already pending.
    async fn create_join_request(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<JoinRequest, StoreError>;

    /// Get join request by ID.
    async fn get_join_request(&self, request_id: &JoinRequestId)
        -> Result<JoinRequest, StoreError>;

    /// Get the pending join request for a (group, user) pair.
    async fn get_pending_join_request(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<JoinRequest, StoreError>;

    /// List pending join requests for a group, oldest first.
    async fn list_pending_join_requests(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<JoinRequest>, StoreError>;

    /// Mark a pending request approved, insert the `member` row if absent and increment
    /// the counter only when a row was inserted. `Conflict` if the request is not pending.
    async fn approve_join_request(
        &self,
        request_id: &JoinRequestId,
        resolved_by: &UserId,
    ) -> Result<ApprovedJoin, StoreError>;

    /// Mark a pending request rejected. `Conflict` if the request is not pending.
    async fn reject_join_request(
        &self,
        request_id: &JoinRequestId,
        resolved_by: &UserId,
    ) -> Result<JoinRequest, StoreError>;
}
