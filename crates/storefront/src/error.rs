//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Errors carry a stable machine-readable kind plus a human-readable message;
//! no internal stack or store detail is exposed to clients. Authorization and
//! validation failures are terminal for the request and are never retried.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::auth::AuthError;
use crate::services::session::SessionError;
use crate::store::StoreError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Caller has no established identity.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Caller is identified but not allowed to do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request input failed validation (e.g., password mismatch).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Reset token is expired, already used, or never existed.
    #[error("This token is either invalid or expired")]
    ExpiredOrInvalidToken,

    /// Write conflicted with concurrent state (safe to retry the operation once).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The payment gateway declined or failed the charge; no order was created.
    #[error("Payment failed: {0}")]
    PaymentGateway(String),

    /// Money and recorded state cannot be proven to agree.
    ///
    /// Two ways in: the charge succeeded but the order could not be
    /// persisted, or the gateway outcome is unknown (timeout). Fatal and
    /// never masked; nothing here is retried, because retrying the charge
    /// would double-bill.
    #[error("Payment reconciliation required (ref {charge_ref})")]
    ReconciliationRequired {
        /// Gateway charge id when the charge is known to have succeeded,
        /// otherwise the idempotency key the attempt was made with.
        charge_ref: String,
    },

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable kind for API clients.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::ExpiredOrInvalidToken => "expired_or_invalid_token",
            Self::Conflict(_) => "conflict",
            Self::PaymentGateway(_) => "payment_gateway_error",
            Self::ReconciliationRequired { .. } => "reconciliation_required",
            Self::Store(_) | Self::Internal(_) => "internal",
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::ExpiredOrInvalidToken => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentGateway(_) => StatusCode::PAYMENT_REQUIRED,
            Self::ReconciliationRequired { .. } | Self::Store(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("resource not found".to_owned()),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Store(other),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                Self::Unauthenticated("invalid email or password".to_owned())
            }
            AuthError::UserAlreadyExists => {
                Self::Conflict("an account with this email already exists".to_owned())
            }
            AuthError::InvalidEmail(e) => Self::Validation(e.to_string()),
            AuthError::WeakPassword(msg) => Self::Validation(msg),
            AuthError::PasswordHash => Self::Internal("password hashing failed".to_owned()),
            AuthError::Store(e) => Self::from(e),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Store(_) | Self::Internal(_) | Self::ReconciliationRequired { .. }
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let kind = self.kind();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Store(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::ReconciliationRequired { .. } => {
                "Your payment could not be confirmed against our records; support has been notified"
                    .to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
