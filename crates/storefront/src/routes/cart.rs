//! Cart route handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use threadline_core::{CartItemId, ItemId};

use crate::error::AppError;
use crate::middleware::RequestContext;
use crate::services::cart::CartService;
use crate::state::AppState;

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub item_id: ItemId,
}

/// Remove-from-cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub cart_item_id: CartItemId,
}

/// View the current cart.
///
/// GET /cart
pub async fn view_cart(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Response, AppError> {
    let service = CartService::new(state.store());
    let lines = service.view(&ctx).await?;
    Ok(Json(lines).into_response())
}

/// Add one unit of an item to the cart.
///
/// POST /cart/add
pub async fn add_to_cart(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(form): Json<AddToCartForm>,
) -> Result<Response, AppError> {
    let service = CartService::new(state.store());
    let cart_item = service.add_to_cart(&ctx, form.item_id).await?;
    Ok((StatusCode::CREATED, Json(cart_item)).into_response())
}

/// Remove a cart row.
///
/// POST /cart/remove
pub async fn remove_from_cart(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(form): Json<RemoveFromCartForm>,
) -> Result<Response, AppError> {
    let service = CartService::new(state.store());
    let removed = service.remove_from_cart(&ctx, form.cart_item_id).await?;
    Ok(Json(json!({ "id": removed })).into_response())
}
