//! Payment gateway contract and Stripe adapter.
//!
//! The gateway is the sole source of truth for payment success. Its charge
//! call is the one suspension point in checkout with externally visible side
//! effects (money movement), so outcomes split three ways:
//!
//! - success: a [`Charge`] with the gateway's reference
//! - declined/failed: the gateway answered no; nothing moved
//! - ambiguous: the request may or may not have been processed (timeout).
//!   Never retried automatically - a blind retry risks a double charge.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;

use threadline_core::{CurrencyCode, Price};

use crate::config::GatewayConfig;

/// Stripe API base URL.
const BASE_URL: &str = "https://api.stripe.com/v1";

/// Bounded timeout for the charge call.
const CHARGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the payment gateway.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The gateway processed the request and declined it. Nothing was charged.
    #[error("charge declined: {reason}")]
    Declined {
        /// Gateway's reason, propagated to the caller.
        reason: String,
    },

    /// The request never completed and the outcome is unknown. The caller
    /// must treat this as requiring reconciliation, not retry.
    #[error("charge outcome unknown: {reason}")]
    Ambiguous {
        /// What went wrong, for the operator.
        reason: String,
    },
}

/// A successful charge.
#[derive(Debug, Clone)]
pub struct Charge {
    /// Gateway charge reference (e.g., `ch_...`).
    pub id: String,
    /// Amount charged, in minor currency units.
    pub amount: Price,
}

/// The charge capability checkout is written against.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge `amount` against a client-obtained payment token.
    ///
    /// `idempotency_key` is generated fresh per checkout attempt and lets an
    /// operator resolve ambiguous outcomes against the gateway's records.
    async fn charge(
        &self,
        amount: Price,
        currency: CurrencyCode,
        payment_token: &str,
        idempotency_key: &str,
    ) -> Result<Charge, PaymentError>;
}

/// Stripe charge API adapter.
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: secrecy::SecretString,
}

#[derive(Debug, Deserialize)]
struct StripeCharge {
    id: String,
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
    code: Option<String>,
}

impl StripeGateway {
    /// Create a new gateway adapter from configuration.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Ambiguous` if the HTTP client cannot be built
    /// (startup-time failure; no charge was attempted).
    pub fn new(config: &GatewayConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(CHARGE_TIMEOUT)
            .build()
            .map_err(|e| PaymentError::Ambiguous {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn charge(
        &self,
        amount: Price,
        currency: CurrencyCode,
        payment_token: &str,
        idempotency_key: &str,
    ) -> Result<Charge, PaymentError> {
        let params = [
            ("amount", amount.minor_units().to_string()),
            ("currency", currency.as_gateway_str().to_owned()),
            ("source", payment_token.to_owned()),
        ];

        let response = self
            .client
            .post(format!("{BASE_URL}/charges"))
            .basic_auth(self.secret_key.expose_secret(), None::<&str>)
            .header("Idempotency-Key", idempotency_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    // Request may have reached the gateway; outcome unknown
                    PaymentError::Ambiguous {
                        reason: format!("charge request timed out: {e}"),
                    }
                } else if e.is_connect() {
                    // Never reached the gateway; nothing was charged
                    PaymentError::Declined {
                        reason: format!("could not reach payment gateway: {e}"),
                    }
                } else {
                    PaymentError::Ambiguous {
                        reason: format!("charge request failed: {e}"),
                    }
                }
            })?;

        let status = response.status();
        if status.is_success() {
            let charge: StripeCharge = response.json().await.map_err(|e| {
                // Money moved (2xx) but we can't read the reference
                PaymentError::Ambiguous {
                    reason: format!("charge succeeded but response was unreadable: {e}"),
                }
            })?;
            let amount =
                Price::from_minor_units(charge.amount).map_err(|e| PaymentError::Ambiguous {
                    reason: format!("charge succeeded with invalid amount: {e}"),
                })?;
            return Ok(Charge {
                id: charge.id,
                amount,
            });
        }

        if status.is_server_error() {
            // 5xx: the gateway may have processed the charge before failing
            return Err(PaymentError::Ambiguous {
                reason: format!("gateway error ({status})"),
            });
        }

        let reason = match response.json::<StripeErrorBody>().await {
            Ok(body) => {
                let message = body
                    .error
                    .message
                    .unwrap_or_else(|| "charge declined".to_owned());
                match body.error.code {
                    Some(code) => format!("{message} ({code})"),
                    None => message,
                }
            }
            Err(_) => format!("charge declined ({status})"),
        };

        Err(PaymentError::Declined { reason })
    }
}
