//! Account service: signup and signin.
//!
//! Passwords are hashed with Argon2id. Signin failure is deliberately
//! uniform: an unknown email and a wrong password are indistinguishable to
//! the caller.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use threadline_core::{Email, PermissionSet};

use crate::models::User;
use crate::store::{Store, StoreError};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during account operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] threadline_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Account service.
pub struct AccountService<'a> {
    store: &'a dyn Store,
}

impl<'a> AccountService<'a> {
    /// Create a new account service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Register a new user with name, email and password.
    ///
    /// The email is normalized to lowercase by `Email::parse`, so
    /// `"Foo@Example.com"` is stored and looked up as `"foo@example.com"`.
    /// New users get the baseline `USER` permission and nothing else.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .store
            .create_user(name, &email, &password_hash, &PermissionSet::signup_default())
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Store(other),
            })?;

        Ok(user)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn signin(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .store
            .password_hash_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }
}

/// Validate password meets requirements.
pub(crate) fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
pub(crate) fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
pub(crate) fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use threadline_core::Permission;

    #[tokio::test]
    async fn signup_normalizes_email_and_grants_user_permission() {
        let store = MemoryStore::new();
        let service = AccountService::new(&store);

        let user = service
            .signup("Flo", "Foo@Example.com", "correct horse battery")
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "foo@example.com");
        assert!(user.permissions.contains(Permission::User));
        assert_eq!(user.permissions.len(), 1);
    }

    #[tokio::test]
    async fn signin_accepts_any_casing_of_email() {
        let store = MemoryStore::new();
        let service = AccountService::new(&store);
        service
            .signup("Flo", "foo@example.com", "correct horse battery")
            .await
            .unwrap();

        let user = service
            .signin("FOO@example.COM", "correct horse battery")
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "foo@example.com");
    }

    #[tokio::test]
    async fn signin_rejects_wrong_password_and_unknown_email_alike() {
        let store = MemoryStore::new();
        let service = AccountService::new(&store);
        service
            .signup("Flo", "foo@example.com", "correct horse battery")
            .await
            .unwrap();

        assert!(matches!(
            service.signin("foo@example.com", "wrong password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            service.signin("nobody@example.com", "whatever!").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn signup_rejects_short_password() {
        let store = MemoryStore::new();
        let service = AccountService::new(&store);
        assert!(matches!(
            service.signup("Flo", "foo@example.com", "short").await,
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[tokio::test]
    async fn signup_rejects_duplicate_email() {
        let store = MemoryStore::new();
        let service = AccountService::new(&store);
        service
            .signup("Flo", "foo@example.com", "correct horse battery")
            .await
            .unwrap();

        assert!(matches!(
            service
                .signup("Other", "Foo@Example.com", "another password")
                .await,
            Err(AuthError::UserAlreadyExists)
        ));
    }
}
