//! Community group types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{GroupId, UserId};

/// Group record
#[derive(Clone, Debug, Serialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: UserId,
    pub image_url: Option<String>,
    pub cover_url: Option<String>,
    pub is_private: bool,
    /// Denormalized count of live member rows.
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating a group together with its creator membership
#[derive(Clone, Debug)]
pub struct CreateGroupParams {
    pub name: String,
    pub description: Option<String>,
    pub creator_id: UserId,
    pub image_url: Option<String>,
    pub cover_url: Option<String>,
    pub is_private: bool,
}

/// Partial update of a group; `None` leaves the column untouched.
///
/// For the nullable columns the inner `Option` distinguishes "clear" (`Some(None)`)
/// from "keep" (`None`).
#[derive(Clone, Debug, Default)]
pub struct UpdateGroupParams {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub cover_url: Option<Option<String>>,
    pub is_private: Option<bool>,
}

impl UpdateGroupParams {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.image_url.is_none()
            && self.cover_url.is_none()
            && self.is_private.is_none()
    }
}
