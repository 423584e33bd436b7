//! User route handlers.

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use threadline_core::{PermissionSet, UserId};

use crate::error::AppError;
use crate::middleware::RequestContext;
use crate::services::users::UserService;
use crate::state::AppState;

/// Permission-update form data: the full replacement set, as stored tags.
#[derive(Debug, Deserialize)]
pub struct UpdatePermissionsForm {
    pub permissions: Vec<String>,
}

/// Current user, or `null` when anonymous.
///
/// GET /me
///
/// Anonymous is a normal state here, not an error.
pub async fn me(ctx: RequestContext) -> Response {
    Json(ctx.user).into_response()
}

/// Replace a user's permission set.
///
/// POST /users/{id}/permissions
pub async fn update_permissions(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
    Json(form): Json<UpdatePermissionsForm>,
) -> Result<Response, AppError> {
    let permissions = PermissionSet::from_strings(&form.permissions)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let service = UserService::new(state.store());
    let user = service
        .update_permissions(&ctx, UserId::new(id), permissions)
        .await?;
    Ok(Json(user).into_response())
}
