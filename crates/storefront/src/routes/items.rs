//! Item route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use threadline_core::ItemId;

use crate::error::AppError;
use crate::middleware::RequestContext;
use crate::models::{ItemDraft, ItemPatch};
use crate::services::items::ItemService;
use crate::state::AppState;

/// Create an item.
///
/// POST /items
pub async fn create_item(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(draft): Json<ItemDraft>,
) -> Result<Response, AppError> {
    let service = ItemService::new(state.store());
    let item = service.create_item(&ctx, draft).await?;
    Ok((StatusCode::CREATED, Json(item)).into_response())
}

/// Update an item.
///
/// PATCH /items/{id}
pub async fn update_item(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
    Json(patch): Json<ItemPatch>,
) -> Result<Response, AppError> {
    let service = ItemService::new(state.store());
    let item = service.update_item(&ctx, ItemId::new(id), patch).await?;
    Ok(Json(item).into_response())
}

/// Delete an item.
///
/// DELETE /items/{id}
pub async fn delete_item(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let service = ItemService::new(state.store());
    let deleted = service.delete_item(&ctx, ItemId::new(id)).await?;
    Ok(Json(json!({ "id": deleted })).into_response())
}
