/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`identity`]: Credential checks and session login/logout
/// - [`middleware`]: Resolves the session into an explicit [`middleware::AuthContext`]
/// - [`authorization`]: The ownership guard applied before mutating owned resources
///
/// # Example
///
/// ```no_run
/// use tasknest_shared::auth::authorization::{require_ownership, Action};
/// use tasknest_shared::auth::middleware::AuthContext;
/// use tasknest_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example(owner: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("pw1")?;
/// assert!(verify_password("pw1", &hash)?);
///
/// let auth = AuthContext::new(owner, "alice");
/// require_ownership(&auth, owner, Action::UpdateTask)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod identity;
pub mod middleware;
pub mod password;
