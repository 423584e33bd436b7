//! Request context extraction.
//!
//! Every handler takes a [`RequestContext`], constructed once per request
//! from the verified session credential: verify the cookie's signature, then
//! load the user record (permissions included) from the store. Identity and
//! authorization facts travel as an explicit argument from here on - nothing
//! downstream re-reads headers or ambient state.
//!
//! A missing or invalid credential is a normal state, not a rejection:
//! public routes accept anonymous contexts, and protected operations fail
//! with `Unauthenticated` inside the service layer where the requirement
//! lives.

use axum::{extract::FromRequestParts, http::request::Parts};

use threadline_core::UserId;

use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;

/// Who is making this request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The authenticated user, if the request carried a valid credential
    /// for a user that still exists.
    pub user: Option<User>,
}

impl RequestContext {
    /// An anonymous context.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user: None }
    }

    /// A context for a known user.
    #[must_use]
    pub const fn for_user(user: User) -> Self {
        Self { user: Some(user) }
    }

    /// The caller's user id, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id)
    }

    /// The caller, or `Unauthenticated`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` for anonymous contexts.
    pub fn require_user(&self) -> Result<&User, AppError> {
        self.user.as_ref().ok_or_else(|| {
            AppError::Unauthenticated("you must be signed in to do that".to_owned())
        })
    }
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(user_id) = state.sessions().verify_from_headers(&parts.headers) else {
            return Ok(Self::anonymous());
        };

        // A valid credential for a since-removed user is no identity
        let user = state.store().user_by_id(user_id).await?;

        if let Some(user) = &user {
            crate::error::set_sentry_user(&user.id, Some(user.email.as_str()));
        }

        Ok(Self { user })
    }
}
