//! Join requests for private groups.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{GroupId, JoinRequestId, JoinRequestStatus, UserId};

/// Join request record
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JoinRequest {
    pub id: JoinRequestId,
    pub group_id: GroupId,
    pub user_id: UserId,
    pub status: JoinRequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<UserId>,
}

/// Result of approving a join request in one unit of work
#[derive(Clone, Debug)]
pub struct ApprovedJoin {
    pub request: JoinRequest,
    /// False when the user already held a membership row (nothing inserted, counter unchanged).
    pub member_added: bool,
    pub member_count: i64,
}
