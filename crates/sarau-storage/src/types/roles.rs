//! Member roles and join request states.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Privilege level of a member within one group.
///
/// Ordered by privilege: `Member < Moderator < Creator`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupRole {
    Member,
    Moderator,
    Creator,
}

/// Error type for parsing GroupRole from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseGroupRoleError(pub String);

impl std::fmt::Display for ParseGroupRoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid group role: {}", self.0)
    }
}

impl std::error::Error for ParseGroupRoleError {}

impl FromStr for GroupRole {
    type Err = ParseGroupRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "creator" => Ok(GroupRole::Creator),
            "moderator" => Ok(GroupRole::Moderator),
            "member" => Ok(GroupRole::Member),
            _ => Err(ParseGroupRoleError(s.to_string())),
        }
    }
}

impl GroupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Creator => "creator",
            GroupRole::Moderator => "moderator",
            GroupRole::Member => "member",
        }
    }
}

impl std::fmt::Display for GroupRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a join request: `Pending` moves once to a terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl FromStr for JoinRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JoinRequestStatus::Pending),
            "approved" => Ok(JoinRequestStatus::Approved),
            "rejected" => Ok(JoinRequestStatus::Rejected),
            _ => Err(format!("invalid join request status: {}", s)),
        }
    }
}

impl JoinRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinRequestStatus::Pending => "pending",
            JoinRequestStatus::Approved => "approved",
            JoinRequestStatus::Rejected => "rejected",
        }
    }

    /// Approved and rejected requests never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JoinRequestStatus::Pending)
    }
}

impl std::fmt::Display for JoinRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(GroupRole::Creator > GroupRole::Moderator);
        assert!(GroupRole::Moderator > GroupRole::Member);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("creator".parse::<GroupRole>().unwrap(), GroupRole::Creator);
        assert_eq!(
            "moderator".parse::<GroupRole>().unwrap(),
            GroupRole::Moderator
        );
        assert_eq!("member".parse::<GroupRole>().unwrap(), GroupRole::Member);
    }

    #[test]
    fn test_role_parse_invalid() {
        assert!("admin".parse::<GroupRole>().is_err());
        assert!("Member".parse::<GroupRole>().is_err()); // Case sensitive
        assert!("".parse::<GroupRole>().is_err());
    }

    #[test]
    fn test_role_roundtrip() {
        for role in [GroupRole::Creator, GroupRole::Moderator, GroupRole::Member] {
            assert_eq!(role.as_str().parse::<GroupRole>().unwrap(), role);
        }
    }

    #[test]
    fn test_parse_role_error_display() {
        let err = ParseGroupRoleError("owner".to_string());
        assert!(err.to_string().contains("owner"));
    }

    #[test]
    fn test_status_terminal() {
        assert!(!JoinRequestStatus::Pending.is_terminal());
        assert!(JoinRequestStatus::Approved.is_terminal());
        assert!(JoinRequestStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&JoinRequestStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
        let role: GroupRole = serde_json::from_str("\"moderator\"").unwrap();
        assert_eq!(role, GroupRole::Moderator);
    }
}
