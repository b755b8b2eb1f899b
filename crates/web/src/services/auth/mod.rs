//! Authentication service.
//!
//! Password login, password change and email-based password reset.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::LazyLock;
use sha2::{Digest, Sha256};
use tracing::instrument;

use teamspirit_core::{Email, UserId, normalize_first_name, normalize_last_name};

use crate::db::{PasswordResetRepository, Repositories, RepositoryError, UserRepository};
use crate::models::{NewUser, User};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// How long a password reset link stays valid, in seconds.
pub const RESET_TOKEN_TTL_SECS: i64 = 3600;

/// Hash checked when the email is unknown, so a miss costs as much as a
/// wrong password.
static DUMMY_PASSWORD_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("teamspirit-no-such-member").unwrap_or_default());

/// A freshly issued password reset token, to be emailed to the member.
///
/// The raw token only exists here; the database holds its SHA-256.
#[derive(Debug, Clone)]
pub struct IssuedResetToken {
    pub user: User,
    pub token: String,
}

impl IssuedResetToken {
    /// Path of the confirmation page, e.g.
    /// `/profile/reset_password_confirm/4/9f86d0.../`.
    #[must_use]
    pub fn confirm_path(&self) -> String {
        format!(
            "/profile/reset_password_confirm/{}/{}/",
            self.user.id, self.token
        )
    }
}

/// Authentication service.
///
/// Handles member creation, login, password change and reset.
pub struct AuthService<'a> {
    users: &'a dyn UserRepository,
    resets: &'a dyn PasswordResetRepository,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(repos: &'a Repositories) -> Self {
        Self {
            users: repos.users.as_ref(),
            resets: repos.password_resets.as_ref(),
        }
    }

    /// Create a member account with an empty profile and the member role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn create_member(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        password: &str,
        is_staff: bool,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let new_user = NewUser {
            email,
            first_name: normalize_first_name(first_name),
            last_name: normalize_last_name(last_name),
            password_hash,
            is_staff,
            is_admin: false,
        };

        self.users.create(&new_user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::InactiveUser` if the password is right but the
    /// account is deactivated.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let Some((user, password_hash)) = self.users.get_with_password_hash(&email).await? else {
            let _ = verify_password(password, &DUMMY_PASSWORD_HASH);
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &password_hash)?;

        if !user.is_active {
            return Err(AuthError::InactiveUser);
        }

        Ok(user)
    }

    /// Change the password of a logged-in member.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs,
    /// `AuthError::WeakPassword` if the new password is too short and
    /// `AuthError::InvalidCredentials` if the old password is wrong.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn change_password(
        &self,
        email: &Email,
        old_password: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<(), AuthError> {
        check_new_password(new_password, confirmation)?;

        let (user, password_hash) = self
            .users
            .get_with_password_hash(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(old_password, &password_hash)?;

        let hash = hash_password(new_password)?;
        self.users.set_password_hash(user.id, &hash).await?;
        tracing::info!(user_id = %user.id, "password changed");
        Ok(())
    }

    /// Issue a reset token for `email`.
    ///
    /// Returns `None` for malformed, unknown or inactive addresses so the
    /// caller can answer identically in every case.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    #[instrument(skip(self))]
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<IssuedResetToken>, AuthError> {
        self.request_password_reset_at(email, Utc::now()).await
    }

    async fn request_password_reset_at(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<IssuedResetToken>, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };
        let Some(user) = self.users.get_by_email(&email).await? else {
            tracing::info!("password reset requested for unknown email");
            return Ok(None);
        };
        if !user.is_active {
            return Ok(None);
        }

        let token = generate_reset_token();
        self.resets
            .create(user.id, &hash_token(&token), now + TimeDelta::seconds(RESET_TOKEN_TTL_SECS))
            .await?;

        tracing::info!(user_id = %user.id, "password reset token issued");
        Ok(Some(IssuedResetToken { user, token }))
    }

    /// Whether a reset link is still usable.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn reset_token_is_valid(
        &self,
        user_id: UserId,
        token: &str,
    ) -> Result<bool, AuthError> {
        Ok(self
            .resets
            .is_valid(user_id, &hash_token(token), Utc::now())
            .await?)
    }

    /// Set a new password from a reset link and burn the token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordMismatch` / `AuthError::WeakPassword` for
    /// bad input and `AuthError::InvalidResetToken` if the link is unknown,
    /// expired or already used.
    #[instrument(skip(self, token, new_password, confirmation))]
    pub async fn confirm_password_reset(
        &self,
        user_id: UserId,
        token: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<(), AuthError> {
        self.confirm_password_reset_at(user_id, token, new_password, confirmation, Utc::now())
            .await
    }

    async fn confirm_password_reset_at(
        &self,
        user_id: UserId,
        token: &str,
        new_password: &str,
        confirmation: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        check_new_password(new_password, confirmation)?;
        let hash = hash_password(new_password)?;

        if !self.resets.consume(user_id, &hash_token(token), now).await? {
            return Err(AuthError::InvalidResetToken);
        }

        self.users.set_password_hash(user_id, &hash).await?;
        tracing::info!(user_id = %user_id, "password reset completed");
        Ok(())
    }
}

/// Check a new password and its confirmation.
fn check_new_password(password: &str, confirmation: &str) -> Result<(), AuthError> {
    if password != confirmation {
        return Err(AuthError::PasswordMismatch);
    }
    validate_password(password)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// 32 random bytes, hex encoded.
fn generate_reset_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// SHA-256 of a reset token, hex encoded. Only this is persisted.
fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::InMemoryDatabase;

    const PASSWORD: &str = "correct horse";

    async fn setup() -> (Repositories, User) {
        let repos = Repositories::in_memory(&InMemoryDatabase::new());
        let user = AuthService::new(&repos)
            .create_member("lucie@example.com", "lucie", "martin", PASSWORD, false)
            .await
            .unwrap();
        (repos, user)
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password(PASSWORD).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(PASSWORD, &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hash_token_is_stable_hex() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), token);
    }

    #[tokio::test]
    async fn test_create_member_normalizes_names() {
        let (_, user) = setup().await;
        assert_eq!(user.first_name, "Lucie");
        assert_eq!(user.last_name, "MARTIN");
    }

    #[tokio::test]
    async fn test_create_member_duplicate_email() {
        let (repos, _) = setup().await;
        let err = AuthService::new(&repos)
            .create_member("lucie@example.com", "x", "y", PASSWORD, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_login() {
        let (repos, user) = setup().await;
        let auth = AuthService::new(&repos);

        assert_eq!(auth.login("lucie@example.com", PASSWORD).await.unwrap().id, user.id);
        assert!(matches!(
            auth.login("lucie@example.com", "nope").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", PASSWORD).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("not an email", PASSWORD).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_dummy_hash_is_a_real_argon2_hash() {
        assert!(DUMMY_PASSWORD_HASH.starts_with("$argon2id$"));
        assert!(PasswordHash::new(&DUMMY_PASSWORD_HASH).is_ok());
        assert!(matches!(
            verify_password(PASSWORD, &DUMMY_PASSWORD_HASH),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_unknown_email_fails_like_wrong_password() {
        let (repos, _) = setup().await;
        let auth = AuthService::new(&repos);

        let unknown = auth.login("nobody@example.com", "nope").await.unwrap_err();
        let wrong = auth.login("lucie@example.com", "nope").await.unwrap_err();
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_change_password() {
        let (repos, user) = setup().await;
        let auth = AuthService::new(&repos);

        assert!(matches!(
            auth.change_password(&user.email, PASSWORD, "new-password", "other-password")
                .await,
            Err(AuthError::PasswordMismatch)
        ));
        assert!(matches!(
            auth.change_password(&user.email, PASSWORD, "short", "short").await,
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            auth.change_password(&user.email, "wrong", "new-password", "new-password")
                .await,
            Err(AuthError::InvalidCredentials)
        ));

        auth.change_password(&user.email, PASSWORD, "new-password", "new-password")
            .await
            .unwrap();
        assert!(auth.login("lucie@example.com", "new-password").await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_unknown_email_issues_nothing() {
        let (repos, _) = setup().await;
        let auth = AuthService::new(&repos);
        assert!(auth
            .request_password_reset("nobody@example.com")
            .await
            .unwrap()
            .is_none());
        assert!(auth.request_password_reset("garbage").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_token_is_single_use() {
        let (repos, user) = setup().await;
        let auth = AuthService::new(&repos);

        let issued = auth
            .request_password_reset("lucie@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            issued.confirm_path(),
            format!("/profile/reset_password_confirm/{}/{}/", user.id, issued.token)
        );
        assert!(auth.reset_token_is_valid(user.id, &issued.token).await.unwrap());

        auth.confirm_password_reset(user.id, &issued.token, "brand-new-pw", "brand-new-pw")
            .await
            .unwrap();
        assert!(auth.login("lucie@example.com", "brand-new-pw").await.is_ok());

        assert!(matches!(
            auth.confirm_password_reset(user.id, &issued.token, "another-pw", "another-pw")
                .await,
            Err(AuthError::InvalidResetToken)
        ));
    }

    #[tokio::test]
    async fn test_reset_token_expires() {
        let (repos, user) = setup().await;
        let auth = AuthService::new(&repos);
        let issued_at = Utc::now() - TimeDelta::hours(2);

        let issued = auth
            .request_password_reset_at("lucie@example.com", issued_at)
            .await
            .unwrap()
            .unwrap();

        assert!(!auth.reset_token_is_valid(user.id, &issued.token).await.unwrap());
        assert!(matches!(
            auth.confirm_password_reset(user.id, &issued.token, "brand-new-pw", "brand-new-pw")
                .await,
            Err(AuthError::InvalidResetToken)
        ));
    }

    #[tokio::test]
    async fn test_reset_token_bound_to_user() {
        let (repos, user) = setup().await;
        let auth = AuthService::new(&repos);
        let issued = auth
            .request_password_reset("lucie@example.com")
            .await
            .unwrap()
            .unwrap();

        let other = UserId::new(user.id.as_i32() + 100);
        assert!(matches!(
            auth.confirm_password_reset(other, &issued.token, "brand-new-pw", "brand-new-pw")
                .await,
            Err(AuthError::InvalidResetToken)
        ));
    }
}
