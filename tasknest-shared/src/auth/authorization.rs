/// Ownership checks
///
/// Every mutating operation on a task or a profile image goes through
/// [`require_ownership`] after the resource has been loaded. The check is a
/// plain comparison of the caller's user id with the resource owner; there are
/// no roles or shared resources.
///
/// # Example
///
/// ```
/// use tasknest_shared::auth::authorization::{require_ownership, Action, AuthzError};
/// use tasknest_shared::auth::middleware::AuthContext;
/// use uuid::Uuid;
///
/// let alice = AuthContext::new(Uuid::new_v4(), "alice");
/// let bobs_task_owner = Uuid::new_v4();
///
/// let err = require_ownership(&alice, bobs_task_owner, Action::UpdateTask).unwrap_err();
/// assert_eq!(err.to_string(), "You do not have permission to edit this task.");
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;

/// Mutating actions that require ownership
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Full or partial task update
    UpdateTask,

    /// Task deletion
    DeleteTask,

    /// Create, replace or delete a profile image
    ModifyProfileImage,
}

impl Action {
    /// Message returned to the caller when the check fails
    pub fn denial_message(&self) -> &'static str {
        match self {
            Action::UpdateTask => "You do not have permission to edit this task.",
            Action::DeleteTask => "You do not have permission to delete this task.",
            Action::ModifyProfileImage => "You do not have permission to modify this profile image.",
        }
    }

    /// Resource kind, for logs
    pub fn resource(&self) -> &'static str {
        match self {
            Action::UpdateTask | Action::DeleteTask => "task",
            Action::ModifyProfileImage => "profile_image",
        }
    }
}

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Caller does not own the resource
    #[error("{}", .action.denial_message())]
    NotOwner { action: Action },
}

impl AuthzError {
    /// The action that was refused
    pub fn action(&self) -> Action {
        match self {
            AuthzError::NotOwner { action } => *action,
        }
    }
}

/// Requires that the caller owns the resource
///
/// # Errors
///
/// Returns `AuthzError::NotOwner` if `auth.user_id != resource_owner_id`
pub fn require_ownership(
    auth: &AuthContext,
    resource_owner_id: Uuid,
    action: Action,
) -> Result<(), AuthzError> {
    if auth.user_id != resource_owner_id {
        tracing::debug!(
            user_id = %auth.user_id,
            owner_id = %resource_owner_id,
            resource = action.resource(),
            "Ownership check failed"
        );
        return Err(AuthzError::NotOwner { action });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_passes() {
        let user_id = Uuid::new_v4();
        let auth = AuthContext::new(user_id, "alice");
        assert!(require_ownership(&auth, user_id, Action::DeleteTask).is_ok());
    }

    #[test]
    fn test_non_owner_fails_with_action_message() {
        let auth = AuthContext::new(Uuid::new_v4(), "alice");
        let other = Uuid::new_v4();

        let err = require_ownership(&auth, other, Action::DeleteTask).unwrap_err();
        assert_eq!(err.action(), Action::DeleteTask);
        assert_eq!(err.to_string(), "You do not have permission to delete this task.");

        let err = require_ownership(&auth, other, Action::ModifyProfileImage).unwrap_err();
        assert_eq!(
            err.to_string(),
            "You do not have permission to modify this profile image."
        );
    }

    #[test]
    fn test_resource_names() {
        assert_eq!(Action::UpdateTask.resource(), "task");
        assert_eq!(Action::ModifyProfileImage.resource(), "profile_image");
    }
}
