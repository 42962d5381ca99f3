//! Group membership types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{GroupId, GroupRole, UserId};

/// Group membership record, unique per (group, user)
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GroupMember {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub role: GroupRole,
    pub created_at: DateTime<Utc>,
}
