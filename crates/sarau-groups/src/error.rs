use sarau_storage::StoreError;
use thiserror::Error;

/// Errors surfaced by the group services.
///
/// `Validation`, `Permission` and `Conflict` are terminal for the caller; `Store`
/// wraps persistence failures and is the only kind worth retrying.
#[derive(Debug, Error)]
pub enum GroupsError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, GroupsError>;

impl GroupsError {
    /// Map a store `NotFound` for the addressed entity onto a typed not-found error.
    pub(crate) fn not_found(entity: &'static str) -> impl FnOnce(StoreError) -> GroupsError {
        move |e| match e {
            StoreError::NotFound => GroupsError::NotFound(entity),
            e => GroupsError::Store(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_mapping() {
        let err = GroupsError::not_found("group")(StoreError::NotFound);
        assert!(matches!(err, GroupsError::NotFound("group")));
        assert_eq!(err.to_string(), "group not found");

        let err = GroupsError::not_found("group")(StoreError::Backend("io".into()));
        assert!(matches!(err, GroupsError::Store(StoreError::Backend(_))));
    }

    #[test]
    fn test_store_error_converts() {
        let err: GroupsError = StoreError::Conflict.into();
        assert!(err.to_string().contains("storage error"));
    }
}
