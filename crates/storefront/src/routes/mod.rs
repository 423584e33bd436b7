//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//!
//! # Auth
//! POST /auth/signup             - Create account (sets session cookie)
//! POST /auth/signin             - Sign in (sets session cookie)
//! POST /auth/signout            - Sign out (clears session cookie)
//! POST /auth/request-reset      - Request a password-reset link
//! POST /auth/reset-password     - Consume a reset token (sets session cookie)
//!
//! # Users
//! GET  /me                      - Current user, or null when anonymous
//! POST /users/{id}/permissions  - Replace a user's permissions (elevated)
//!
//! # Items
//! POST   /items                 - Create item (authenticated)
//! PATCH  /items/{id}            - Update item (owner or elevated)
//! DELETE /items/{id}            - Delete item (owner or elevated)
//!
//! # Cart
//! GET  /cart                    - Current cart (authenticated)
//! POST /cart/add                - Add one unit of an item (authenticated)
//! POST /cart/remove             - Remove a cart row (owner)
//!
//! # Orders
//! POST /orders                  - Charge the cart and create an order
//! ```

pub mod auth;
pub mod cart;
pub mod items;
pub mod orders;
pub mod users;

use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/signin", post(auth::signin))
        .route("/signout", post(auth::signout))
        .route("/request-reset", post(auth::request_reset))
        .route("/reset-password", post(auth::reset_password))
}

/// Compose every route group into the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/auth", auth_routes())
        .route("/me", get(users::me))
        .route("/users/{id}/permissions", post(users::update_permissions))
        .route("/items", post(items::create_item))
        .route(
            "/items/{id}",
            patch(items::update_item).delete(items::delete_item),
        )
        .route("/cart", get(cart::view_cart))
        .route("/cart/add", post(cart::add_to_cart))
        .route("/cart/remove", post(cart::remove_from_cart))
        .route("/orders", post(orders::create_order))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
