//! Authentication route handlers.
//!
//! Signup, signin, signout and the password-reset pair. The session
//! credential rides on the response as an http-only cookie; signup, signin
//! and a successful reset all attach it (reset implicitly logs the user in).

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, clear_sentry_user};
use crate::models::User;
use crate::services::auth::AccountService;
use crate::services::reset::PasswordResetFlow;
use crate::services::session::SessionTokenManager;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Signup form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Signin form data.
#[derive(Debug, Deserialize)]
pub struct SigninForm {
    pub email: String,
    pub password: String,
}

/// Reset-request form data.
#[derive(Debug, Deserialize)]
pub struct RequestResetForm {
    pub email: String,
}

/// Reset-password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub reset_token: String,
    pub password: String,
    pub confirm_password: String,
}

/// Attach a fresh session credential for `user` to a JSON response.
fn signed_in_response(
    sessions: &SessionTokenManager,
    user: &User,
    status: StatusCode,
) -> Result<Response, AppError> {
    let credential = sessions.issue(user.id)?;
    let cookie = sessions.login_cookie(&credential)?;

    let mut response = (status, Json(user)).into_response();
    response.headers_mut().insert(SET_COOKIE, cookie);
    Ok(response)
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle signup.
///
/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(form): Json<SignupForm>,
) -> Result<Response, AppError> {
    let service = AccountService::new(state.store());
    let user = service
        .signup(&form.name, &form.email, &form.password)
        .await?;

    tracing::info!(user_id = %user.id, "user signed up");
    signed_in_response(state.sessions(), &user, StatusCode::CREATED)
}

/// Handle signin.
///
/// POST /auth/signin
pub async fn signin(
    State(state): State<AppState>,
    Json(form): Json<SigninForm>,
) -> Result<Response, AppError> {
    let service = AccountService::new(state.store());
    let user = service.signin(&form.email, &form.password).await?;

    signed_in_response(state.sessions(), &user, StatusCode::OK)
}

/// Handle signout.
///
/// POST /auth/signout
///
/// Clears the cookie only. There is no server-side revocation list, so the
/// credential itself stays valid until its natural expiry.
pub async fn signout() -> Response {
    clear_sentry_user();

    let mut response = Json(json!({ "message": "Goodbye!" })).into_response();
    response
        .headers_mut()
        .insert(SET_COOKIE, SessionTokenManager::clear_cookie());
    response
}

/// Handle a password-reset request.
///
/// POST /auth/request-reset
pub async fn request_reset(
    State(state): State<AppState>,
    Json(form): Json<RequestResetForm>,
) -> Result<Response, AppError> {
    let flow = PasswordResetFlow::new(state.store(), state.mailer(), state.config());
    flow.request_reset(&form.email).await?;

    Ok(Json(json!({ "message": "Check your email for a reset link" })).into_response())
}

/// Handle reset-token consumption.
///
/// POST /auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(form): Json<ResetPasswordForm>,
) -> Result<Response, AppError> {
    let flow = PasswordResetFlow::new(state.store(), state.mailer(), state.config());
    let user = flow
        .consume_reset(&form.reset_token, &form.password, &form.confirm_password)
        .await?;

    signed_in_response(state.sessions(), &user, StatusCode::OK)
}
