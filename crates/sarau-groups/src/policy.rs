//! Role-based authorization for group actions.
//!
//! `permits` is a pure function of the actor's role, the action and (for actions aimed at
//! another member) the target's role. Callers resolve roles from the store first; a user
//! with no membership row is never permitted anything here.

use sarau_storage::GroupRole;

/// Something a member may try to do inside a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    ViewMembers,
    Leave,
    ViewRequests,
    ResolveRequest,
    RemoveMember,
    ChangeRole,
    /// Edit descriptive fields: name, description, images.
    UpdateGroup,
    UpdatePrivacy,
    DeleteGroup,
    RecountMembers,
}

/// Whether `actor` may perform `action`, optionally against a member holding `target`.
///
/// `RemoveMember` and `ChangeRole` require a target; without one they are denied.
pub fn permits(actor: GroupRole, action: Action, target: Option<GroupRole>) -> bool {
    use GroupRole::*;

    match action {
        Action::ViewMembers => true,
        Action::Leave => actor != Creator,
        Action::ViewRequests | Action::ResolveRequest | Action::UpdateGroup => actor >= Moderator,
        Action::RemoveMember => matches!(
            (actor, target),
            (Creator, Some(Member | Moderator)) | (Moderator, Some(Member))
        ),
        Action::ChangeRole => matches!((actor, target), (Creator, Some(Member | Moderator))),
        Action::UpdatePrivacy | Action::DeleteGroup | Action::RecountMembers => actor == Creator,
    }
}
