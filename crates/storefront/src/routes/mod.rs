//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                  - Home page
//! GET  /health                            - Liveness check
//! GET  /health/ready                      - Readiness check (backend reachable)
//!
//! # Products
//! GET  /products                          - Listing with filters, sort, pagination
//! GET  /products/{id}                     - Product detail
//! GET  /products/{id}/colors?size=        - Colors in stock for a size (fragment)
//! POST /products/{id}/reviews             - Post a review (login required)
//! GET  /products/{id}/recommendations/similar?model=  - "You might also like" fragment
//! GET  /products/{id}/recommendations/outfit?model=   - "Complete the look" fragment
//!
//! # Cart (HTMX fragments)
//! GET  /cart                              - Cart page (reconciled against fresh data)
//! POST /cart/add                          - Add a variant (triggers cart-updated)
//! POST /cart/update                       - Set quantity (returns cart_items fragment)
//! POST /cart/remove                       - Remove line (returns cart_items fragment)
//! POST /cart/toggle                       - Toggle line selection (returns cart_items fragment)
//! POST /cart/select-all                   - Select or clear all (returns cart_items fragment)
//! GET  /cart/count                        - Cart count badge (fragment)
//!
//! # Checkout (login required)
//! GET  /checkout                          - Summary of selected lines + address form
//! POST /checkout                          - Place order, redirect to payment or order page
//!
//! # Account (login required)
//! GET  /account/orders                    - Order history
//! GET  /account/orders/{id}               - Order detail
//! GET  /account/favorites                 - Favorite products
//! POST /account/favorites/{id}            - Toggle favorite
//!
//! # Auth (rate limited)
//! GET  /auth/login                        - Login page
//! POST /auth/login                        - Login action
//! GET  /auth/register                     - Register page
//! POST /auth/register                     - Register action
//! POST /auth/logout                       - Logout action
//!
//! # Assistant
//! GET  /chat                              - Conversation page
//! POST /chat                              - Send a message (rate limited)
//! POST /chat/reset                        - Forget the conversation
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod chat;
pub mod checkout;
pub mod home;
pub mod products;
pub mod recommendations;
pub mod reviews;

use atelier_client::ApiError;
use axum::{
    Router,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::error::Result;
use crate::middleware::{auth_rate_limiter, chat_rate_limiter, clear_current_user, set_flash};
use crate::models::Flash;
use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/colors", get(products::colors))
        .route("/{id}/reviews", post(reviews::create))
        .route(
            "/{id}/recommendations/similar",
            get(recommendations::similar),
        )
        .route("/{id}/recommendations/outfit", get(recommendations::outfit))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/toggle", post(cart::toggle))
        .route("/select-all", post(cart::select_all))
        .route("/count", get(cart::count))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
        .route("/favorites", get(account::favorites))
        .route("/favorites/{id}", post(account::toggle_favorite))
}

/// Create the auth routes router.
///
/// Form submissions are rate limited per client IP.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/logout", post(auth::logout))
        .merge(limited)
}

/// Create the assistant routes router.
pub fn chat_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/", post(chat::send))
        .layer(chat_rate_limiter());

    Router::new()
        .route("/", get(chat::show))
        .route("/reset", post(chat::reset))
        .merge(limited)
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::place))
        .nest("/account", account_routes())
        .nest("/auth", auth_routes())
        .nest("/chat", chat_routes())
}

/// Whether the request came from HTMX and expects a fragment.
pub(crate) fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// Queue a flash message and redirect.
///
/// A failed flash write is logged, not fatal: the redirect still happens.
pub(crate) async fn redirect_with_flash(session: &Session, flash: Flash, to: &str) -> Response {
    if let Err(e) = set_flash(session, flash).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
    Redirect::to(to).into_response()
}

/// Turn an upstream failure on a signed-in page into a response.
///
/// A rejected token ends the shopper's session and sends them to sign in
/// again; anything else propagates.
pub(crate) async fn upstream_failure(session: &Session, err: ApiError) -> Result<Response> {
    if matches!(err, ApiError::Unauthorized(_)) {
        clear_current_user(session).await?;
        return Ok(redirect_with_flash(
            session,
            Flash::error("Your session expired. Please sign in again."),
            "/auth/login",
        )
        .await);
    }
    Err(err.into())
}
