//! Storage abstraction for sarau community groups.
//!
//! Backend crates (e.g., sarau-store-sqlite) implement this trait so
//! `sarau-groups` doesn't depend on any specific database engine or schema details.

use thiserror::Error;

mod store;
mod types;

pub use store::*;
pub use types::*;

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("conflict")]
    Conflict,
    #[error("backend error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    // Tiny compile-time smoke test for trait object usage.
    struct NoopStore;

    fn noop_group(id: GroupId, creator_id: UserId) -> Group {
        Group {
            id,
            name: "noop".to_string(),
            description: None,
            creator_id,
            image_url: None,
            cover_url: None,
            is_private: false,
            member_count: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[async_trait::async_trait]
    impl Store for NoopStore {
        async fn create_group(&self, params: &CreateGroupParams) -> Result<Group, StoreError> {
            Ok(noop_group(GroupId::new(), params.creator_id))
        }

        async fn get_group(&self, _group_id: &GroupId) -> Result<Group, StoreError> {
            Err(StoreError::NotFound)
        }

        async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
            Ok(vec![])
        }

        async fn list_user_groups(&self, _user_id: &UserId) -> Result<Vec<Group>, StoreError> {
            Ok(vec![])
        }

        async fn update_group(
            &self,
            _group_id: &GroupId,
            _params: &UpdateGroupParams,
        ) -> Result<Group, StoreError> {
            Err(StoreError::NotFound)
        }

        async fn delete_group(&self, _group_id: &GroupId) -> Result<(), StoreError> {
            Ok(())
        }

        async fn recount_members(&self, _group_id: &GroupId) -> Result<i64, StoreError> {
            Ok(0)
        }

        async fn get_member(
            &self,
            _group_id: &GroupId,
            _user_id: &UserId,
        ) -> Result<GroupMember, StoreError> {
            Err(StoreError::NotFound)
        }

        async fn list_members(&self, _group_id: &GroupId) -> Result<Vec<GroupMember>, StoreError> {
            Ok(vec![])
        }

        async fn add_member(
            &self,
            _group_id: &GroupId,
            _user_id: &UserId,
            _role: GroupRole,
        ) -> Result<i64, StoreError> {
            Ok(1)
        }

        async fn remove_member(
            &self,
            _group_id: &GroupId,
            _user_id: &UserId,
        ) -> Result<i64, StoreError> {
            Err(StoreError::NotFound)
        }

        async fn update_member_role(
            &self,
            _group_id: &GroupId,
            _user_id: &UserId,
            _role: GroupRole,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn count_members(&self, _group_id: &GroupId) -> Result<i64, StoreError> {
            Ok(0)
        }

        async fn create_join_request(
            &self,
            group_id: &GroupId,
            user_id: &UserId,
        ) -> Result<JoinRequest, StoreError> {
            Ok(JoinRequest {
                id: JoinRequestId::new(),
                group_id: *group_id,
                user_id: *user_id,
                status: JoinRequestStatus::Pending,
                created_at: Utc::now(),
                resolved_at: None,
                resolved_by: None,
            })
        }

        async fn get_join_request(
            &self,
            _request_id: &JoinRequestId,
        ) -> Result<JoinRequest, StoreError> {
            Err(StoreError::NotFound)
        }

        async fn get_pending_join_request(
            &self,
            _group_id: &GroupId,
            _user_id: &UserId,
        ) -> Result<JoinRequest, StoreError> {
            Err(StoreError::NotFound)
        }

        async fn list_pending_join_requests(
            &self,
            _group_id: &GroupId,
        ) -> Result<Vec<JoinRequest>, StoreError> {
            Ok(vec![])
        }

        async fn approve_join_request(
            &self,
            _request_id: &JoinRequestId,
            _resolved_by: &UserId,
        ) -> Result<ApprovedJoin, StoreError> {
            Err(StoreError::Conflict)
        }

        async fn reject_join_request(
            &self,
            _request_id: &JoinRequestId,
            _resolved_by: &UserId,
        ) -> Result<JoinRequest, StoreError> {
            Err(StoreError::Conflict)
        }
    }

    #[tokio::test]
    async fn trait_smoke() {
        let s: Box<dyn Store> = Box::new(NoopStore);
        let creator = UserId::new();

        let group = s
            .create_group(&CreateGroupParams {
                name: "Poetas".to_string(),
                description: None,
                creator_id: creator,
                image_url: None,
                cover_url: None,
                is_private: false,
            })
            .await
            .unwrap();
        assert_eq!(group.creator_id, creator);

        let request = s
            .create_join_request(&group.id, &UserId::new())
            .await
            .unwrap();
        assert_eq!(request.status, JoinRequestStatus::Pending);

        assert!(matches!(
            s.approve_join_request(&request.id, &creator).await,
            Err(StoreError::Conflict)
        ));
    }

    #[test]
    fn test_store_error_display() {
        assert_eq!(StoreError::NotFound.to_string(), "not found");
        assert!(StoreError::Backend("disk full".into())
            .to_string()
            .contains("disk full"));
    }

    #[test]
    fn test_update_params_is_empty() {
        assert!(UpdateGroupParams::default().is_empty());
        let params = UpdateGroupParams {
            description: Some(None),
            ..Default::default()
        };
        assert!(!params.is_empty());
    }
}
