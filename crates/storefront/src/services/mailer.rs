//! Outbound mail contract.
//!
//! The core only needs one notification: "send a password-reset link". The
//! delivery mechanism is behind the [`Mailer`] trait; production wires up the
//! transactional mail API, and deployments without one fall back to logging
//! the link so local flows stay usable.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde_json::json;
use std::time::Duration;

use threadline_core::Email;

use crate::config::MailerConfig;

/// Request timeout for the mail API.
const MAIL_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when sending mail.
#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("mail API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Client could not be constructed from configuration.
    #[error("mailer configuration error: {0}")]
    Config(String),
}

/// Sends the notifications the storefront needs.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a password-reset notification carrying the recovery link.
    async fn send_password_reset(&self, to: &Email, reset_url: &str) -> Result<(), MailerError>;
}

/// Mailer backed by a transactional mail HTTP API.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
}

impl HttpMailer {
    /// Create a new mail API client.
    ///
    /// # Errors
    ///
    /// Returns `MailerError::Config` if the API key is not a valid header
    /// value, `MailerError::Http` if the client fails to build.
    pub fn new(config: &MailerConfig) -> Result<Self, MailerError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| MailerError::Config(format!("invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(MAIL_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_password_reset(&self, to: &Email, reset_url: &str) -> Result<(), MailerError> {
        let body = json!({
            "to": to.as_str(),
            "template": "password-reset",
            "variables": { "reset_url": reset_url },
        });

        let response = self.client.post(&self.api_url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(MailerError::Api { status, message });
        }

        Ok(())
    }
}

/// Mailer that logs instead of sending. Used when no provider is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, to: &Email, reset_url: &str) -> Result<(), MailerError> {
        tracing::info!(to = %to, reset_url, "password reset requested (no mail provider configured)");
        Ok(())
    }
}
