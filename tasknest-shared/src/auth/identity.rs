/// Identity provider
///
/// Registration and credential checks go through the resource store; login
/// and logout manipulate the server-side session:
///
/// - [`login`] rotates the session id before storing the identity, so a
///   session id seen before login is useless afterwards;
/// - [`logout`] flushes the session (data and cookie).
///
/// Argon2 work runs on the blocking pool.

use tokio::task;
use tower_sessions::Session;
use tracing::{debug, info};

use super::middleware::{SessionIdentity, SESSION_IDENTITY_KEY};
use super::password::{burn_verification, hash_password, verify_password, PasswordError};
use crate::models::user::{CreateUser, User};
use crate::store::{ResourceStore, StoreError};

/// Identity provider errors
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Unknown username or wrong password
    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// A new account as submitted by the client
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

async fn blocking<T, F>(f: F) -> Result<T, PasswordError>
where
    F: FnOnce() -> Result<T, PasswordError> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| PasswordError::HashError(format!("hashing task failed: {}", e)))?
}

/// Hashes the password and creates the user
///
/// # Errors
///
/// `IdentityError::Store(StoreError::Conflict)` if the username is taken.
pub async fn register(store: &dyn ResourceStore, account: NewAccount) -> Result<User, IdentityError> {
    let password = account.password;
    let password_hash = blocking(move || hash_password(&password)).await?;

    let user = store
        .create_user(CreateUser {
            username: account.username,
            password_hash,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, "User registered");
    Ok(user)
}

/// Checks a username/password pair
///
/// # Errors
///
/// `IdentityError::InvalidCredentials` for an unknown username or a wrong
/// password; the two cases are indistinguishable to the caller.
pub async fn authenticate(
    store: &dyn ResourceStore,
    username: &str,
    password: &str,
) -> Result<User, IdentityError> {
    let password = password.to_string();

    let Some(user) = store.find_user_by_username(username).await? else {
        blocking(move || {
            burn_verification(&password);
            Ok(())
        })
        .await?;
        debug!(%username, "Login for unknown username");
        return Err(IdentityError::InvalidCredentials);
    };

    let hash = user.password_hash.clone();
    if !blocking(move || verify_password(&password, &hash)).await? {
        debug!(user_id = %user.id, "Login with wrong password");
        return Err(IdentityError::InvalidCredentials);
    }

    Ok(user)
}

/// Attaches the user to the session and stamps `last_login`
pub async fn login(
    store: &dyn ResourceStore,
    session: &Session,
    user: &User,
) -> Result<(), IdentityError> {
    session.cycle_id().await?;
    session
        .insert(SESSION_IDENTITY_KEY, SessionIdentity::from(user))
        .await?;
    store.record_login(user.id).await?;

    info!(user_id = %user.id, "User logged in");
    Ok(())
}

/// Ends the session
pub async fn logout(session: &Session) -> Result<(), IdentityError> {
    if let Some(identity) = current_identity(session).await? {
        info!(user_id = %identity.user_id, "User logged out");
    }
    session.flush().await?;
    Ok(())
}

/// The identity stored in the session, if anyone is logged in
pub async fn current_identity(session: &Session) -> Result<Option<SessionIdentity>, IdentityError> {
    Ok(session.get::<SessionIdentity>(SESSION_IDENTITY_KEY).await?)
}
