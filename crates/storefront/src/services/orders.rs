//! Checkout: cart to order, with the money recomputed server-side.
//!
//! The client supplies a payment token and nothing else. The charge amount
//! is recomputed here from the store's current item prices - a compromised
//! or buggy client cannot under- or over-charge itself by submitting a
//! falsified amount.
//!
//! Failure semantics around the gateway call:
//!
//! - decline: no order, cart intact, `PaymentGateway` with the gateway's
//!   reason.
//! - ambiguous (timeout, unknown outcome): surfaced as
//!   `ReconciliationRequired` carrying the idempotency key; never retried,
//!   since a retry could double-bill.
//! - charge succeeded but order persistence failed: money moved without a
//!   record. `ReconciliationRequired` carrying the charge id; the cart is
//!   left as-is for the operator. Persistence is not retried either - only
//!   a human can safely resolve this state.

use threadline_core::{CurrencyCode, Price};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::RequestContext;
use crate::models::{CartLine, Order, OrderDraft, OrderItem};
use crate::services::payment::{PaymentError, PaymentGateway};
use crate::store::Store;

/// Checkout service.
pub struct CheckoutService<'a> {
    store: &'a dyn Store,
    gateway: &'a dyn PaymentGateway,
    currency: CurrencyCode,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(
        store: &'a dyn Store,
        gateway: &'a dyn PaymentGateway,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            store,
            gateway,
            currency,
        }
    }

    /// Convert the caller's cart into a charged, persisted order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` for anonymous callers,
    /// `AppError::Validation` for an empty cart, `AppError::PaymentGateway`
    /// when the charge is declined, and `AppError::ReconciliationRequired`
    /// when money and records cannot be proven to agree.
    pub async fn create_order(
        &self,
        ctx: &RequestContext,
        payment_token: &str,
    ) -> Result<Order, AppError> {
        let caller = ctx.require_user()?;

        let cart = self.store.cart_for_user(caller.id).await?;
        if cart.is_empty() {
            return Err(AppError::Validation("your cart is empty".to_owned()));
        }

        let total = total_of(&cart)?;

        // Fresh key per attempt; the reference an operator reconciles with
        // when the outcome is ambiguous.
        let idempotency_key = Uuid::new_v4().to_string();

        let charge = self
            .gateway
            .charge(total, self.currency, payment_token, &idempotency_key)
            .await
            .map_err(|e| match e {
                PaymentError::Declined { reason } => {
                    tracing::warn!(user_id = %caller.id, %reason, "charge declined");
                    AppError::PaymentGateway(reason)
                }
                PaymentError::Ambiguous { reason } => {
                    tracing::error!(
                        user_id = %caller.id,
                        idempotency_key,
                        %reason,
                        "charge outcome unknown; reconciliation required"
                    );
                    AppError::ReconciliationRequired {
                        charge_ref: idempotency_key.clone(),
                    }
                }
            })?;

        let draft = OrderDraft {
            user_id: caller.id,
            items: cart.iter().map(snapshot_line).collect(),
            total,
            charge_id: charge.id.clone(),
        };

        // Money has moved. A persistence failure here must never be masked,
        // and the charge must never be re-issued.
        let order = match self.store.create_order(&draft).await {
            Ok(order) => order,
            Err(e) => {
                tracing::error!(
                    user_id = %caller.id,
                    charge_id = %charge.id,
                    error = %e,
                    "charge succeeded but order persistence failed"
                );
                return Err(AppError::ReconciliationRequired {
                    charge_ref: charge.id,
                });
            }
        };

        tracing::info!(
            order_id = %order.id,
            user_id = %caller.id,
            total = %order.total,
            "order created"
        );
        Ok(order)
    }
}

/// Authoritative total: sum of current item price times quantity.
fn total_of(cart: &[CartLine]) -> Result<Price, AppError> {
    let mut total = Price::ZERO;
    for line in cart {
        let line_total = line
            .line_total()
            .map_err(|e| AppError::Internal(format!("cart total overflowed: {e}")))?;
        total = total
            .checked_add(line_total)
            .map_err(|e| AppError::Internal(format!("cart total overflowed: {e}")))?;
    }
    Ok(total)
}

/// Copy the attributes a past order must remember about a purchased item.
fn snapshot_line(line: &CartLine) -> OrderItem {
    OrderItem {
        item_id: line.item.id,
        title: line.item.title.clone(),
        description: line.item.description.clone(),
        image: line.item.image.clone(),
        price: line.item.price,
        quantity: line.cart_item.quantity,
    }
}
