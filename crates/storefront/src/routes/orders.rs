//! Order route handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::RequestContext;
use crate::services::orders::CheckoutService;
use crate::state::AppState;

/// Checkout form data. The token is the gateway's representation of the
/// payment method; no amount field exists anywhere in this API.
#[derive(Debug, Deserialize)]
pub struct CreateOrderForm {
    pub token: String,
}

/// Charge the cart and create an order.
///
/// POST /orders
pub async fn create_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(form): Json<CreateOrderForm>,
) -> Result<Response, AppError> {
    let service = CheckoutService::new(
        state.store(),
        state.gateway(),
        state.config().gateway.currency,
    );
    let order = service.create_order(&ctx, &form.token).await?;
    Ok((StatusCode::CREATED, Json(order)).into_response())
}
