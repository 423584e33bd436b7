//! Password-reset lifecycle.
//!
//! Per user the token moves `Idle -> Requested -> (Consumed | Expired)`:
//!
//! - `request_reset` generates a 20-byte (160-bit) hex token from a
//!   cryptographically secure source, stamps a one-hour expiry, persists
//!   both, and fires the reset notification. Only one token is outstanding
//!   per user: a second request overwrites, and thereby invalidates, the
//!   first. Concurrent multi-device reset requests don't compose; that is a
//!   deliberate property of this design.
//! - `consume_reset` is single-use by construction: the store's
//!   compare-and-clear matches the token and its unexpired window and clears
//!   the fields in the same write, so a replay or a concurrent duplicate
//!   finds nothing to match.
//!
//! Consuming a token counts as proving control of the mailbox, so the
//! caller issues a fresh session credential on success - reset logs the
//! user in.

use chrono::{Duration, Utc};
use rand::RngCore;

use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::models::User;
use crate::services::auth;
use crate::services::mailer::Mailer;
use crate::store::Store;

/// Token entropy: 20 random bytes, hex-encoded to 40 characters.
const RESET_TOKEN_BYTES: usize = 20;

/// How long a reset token stays valid.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Password-reset flow.
pub struct PasswordResetFlow<'a> {
    store: &'a dyn Store,
    mailer: &'a dyn Mailer,
    config: &'a StorefrontConfig,
}

impl<'a> PasswordResetFlow<'a> {
    /// Create a new reset flow.
    #[must_use]
    pub const fn new(
        store: &'a dyn Store,
        mailer: &'a dyn Mailer,
        config: &'a StorefrontConfig,
    ) -> Self {
        Self {
            store,
            mailer,
            config,
        }
    }

    /// Attach a fresh reset token to the account behind `email` and send the
    /// recovery link.
    ///
    /// The acknowledgement does not depend on the notification outcome:
    /// mailer failures are logged and swallowed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a malformed email and
    /// `AppError::NotFound` when no account matches.
    pub async fn request_reset(&self, email: &str) -> Result<(), AppError> {
        let email = threadline_core::Email::parse(email)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let user = self
            .store
            .user_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no account for email {email}")))?;

        let mut token_bytes = [0u8; RESET_TOKEN_BYTES];
        rand::rng().fill_bytes(&mut token_bytes);
        let token = hex::encode(token_bytes);

        let expiry = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        self.store.set_reset_token(user.id, &token, expiry).await?;

        let reset_url = self.config.reset_link(&token);
        if let Err(e) = self.mailer.send_password_reset(&email, &reset_url).await {
            tracing::warn!(user_id = %user.id, error = %e, "failed to send reset notification");
        }

        Ok(())
    }

    /// Consume a reset token and set the new password.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when the passwords don't match or the
    /// new password is too weak, and `AppError::ExpiredOrInvalidToken` when
    /// the token doesn't match an unexpired outstanding token (including the
    /// already-consumed case).
    pub async fn consume_reset(
        &self,
        token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<User, AppError> {
        if new_password != confirm_password {
            return Err(AppError::Validation(
                "your passwords don't match".to_owned(),
            ));
        }
        auth::validate_password(new_password)?;

        let password_hash = auth::hash_password(new_password)?;

        // Validity is a closed interval: a token consumed exactly at its
        // expiry instant still succeeds.
        let user = self
            .store
            .consume_reset_token(token, Utc::now(), &password_hash)
            .await?
            .ok_or(AppError::ExpiredOrInvalidToken)?;

        tracing::info!(user_id = %user.id, "password reset completed");
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::mailer::MailerError;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use secrecy::SecretString;
    use threadline_core::{CurrencyCode, Email, PermissionSet};

    /// Records every send; optionally fails them all.
    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_password_reset(
            &self,
            to: &Email,
            reset_url: &str,
        ) -> Result<(), MailerError> {
            self.sent
                .lock()
                .push((to.as_str().to_owned(), reset_url.to_owned()));
            if self.fail {
                return Err(MailerError::Api {
                    status: 500,
                    message: "provider down".to_owned(),
                });
            }
            Ok(())
        }
    }

    fn config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://threadline.shop".to_owned(),
            session_secret: SecretString::from("x".repeat(32)),
            gateway: crate::config::GatewayConfig {
                secret_key: SecretString::from("sk_test_4eC39HqLyjWDarjtT1zdp7dc"),
                currency: CurrencyCode::USD,
            },
            mailer: None,
            sentry_dsn: None,
        }
    }

    async fn seed_user(store: &MemoryStore) {
        store
            .create_user(
                "Flo",
                &Email::parse("flo@example.com").unwrap(),
                "$argon2id$old",
                &PermissionSet::signup_default(),
            )
            .await
            .unwrap();
    }

    fn extract_token(reset_url: &str) -> String {
        reset_url
            .split("token=")
            .nth(1)
            .map(str::to_owned)
            .unwrap()
    }

    #[tokio::test]
    async fn request_reset_sends_link_with_hex_token() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::default();
        let config = config();
        seed_user(&store).await;

        let flow = PasswordResetFlow::new(&store, &mailer, &config);
        flow.request_reset("Flo@Example.com").await.unwrap();

        let sent = mailer.sent.lock();
        assert_eq!(sent.len(), 1);
        let (to, url) = &sent[0];
        assert_eq!(to, "flo@example.com");
        let token = extract_token(url);
        assert_eq!(token.len(), RESET_TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn request_reset_unknown_email_is_not_found() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::default();
        let config = config();

        let flow = PasswordResetFlow::new(&store, &mailer, &config);
        let err = flow.request_reset("nobody@example.com").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(mailer.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn request_reset_acknowledges_despite_mailer_failure() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer {
            fail: true,
            ..RecordingMailer::default()
        };
        let config = config();
        seed_user(&store).await;

        let flow = PasswordResetFlow::new(&store, &mailer, &config);
        flow.request_reset("flo@example.com").await.unwrap();
    }

    #[tokio::test]
    async fn consume_reset_rejects_password_mismatch_without_touching_token() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::default();
        let config = config();
        seed_user(&store).await;

        let flow = PasswordResetFlow::new(&store, &mailer, &config);
        flow.request_reset("flo@example.com").await.unwrap();
        let token = extract_token(&mailer.sent.lock()[0].1);

        let err = flow
            .consume_reset(&token, "new password 1", "new password 2")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // The mismatch never reached the store; the token still works
        flow.consume_reset(&token, "new password 1", "new password 1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn consume_reset_is_single_use() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::default();
        let config = config();
        seed_user(&store).await;

        let flow = PasswordResetFlow::new(&store, &mailer, &config);
        flow.request_reset("flo@example.com").await.unwrap();
        let token = extract_token(&mailer.sent.lock()[0].1);

        flow.consume_reset(&token, "fresh password", "fresh password")
            .await
            .unwrap();

        let err = flow
            .consume_reset(&token, "another password", "another password")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExpiredOrInvalidToken));
    }

    #[tokio::test]
    async fn second_request_invalidates_first_token() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::default();
        let config = config();
        seed_user(&store).await;

        let flow = PasswordResetFlow::new(&store, &mailer, &config);
        flow.request_reset("flo@example.com").await.unwrap();
        flow.request_reset("flo@example.com").await.unwrap();

        let (first, second) = {
            let sent = mailer.sent.lock();
            (extract_token(&sent[0].1), extract_token(&sent[1].1))
        };
        assert_ne!(first, second);

        let err = flow
            .consume_reset(&first, "fresh password", "fresh password")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExpiredOrInvalidToken));

        flow.consume_reset(&second, "fresh password", "fresh password")
            .await
            .unwrap();
    }
}
