//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness check
//! GET  /health/ready                   - Readiness check (backend reachable)
//!
//! # Dashboard
//! GET  /?range=30d                     - Order statistics
//!
//! # Auth (backend login, admin role required)
//! GET  /auth/login                     - Login page
//! POST /auth/login                     - Login action
//! POST /auth/logout                    - Logout
//!
//! # Products
//! GET  /products?q=&page=              - Product listing
//! GET  /products/new                   - New product form
//! POST /products                       - Create product
//! GET  /products/{id}/edit             - Edit product form
//! POST /products/{id}                  - Update product
//! POST /products/{id}/delete           - Delete product
//!
//! # Brands and categories
//! GET  /brands                         - Brand list with inline forms
//! POST /brands                         - Create brand
//! POST /brands/{id}                    - Rename brand
//! POST /brands/{id}/delete             - Delete brand
//! (same four routes under /categories)
//!
//! # Users
//! GET  /users                          - User list
//! POST /users/{id}/role                - Change role
//! POST /users/{id}/delete              - Delete user
//!
//! # Orders
//! GET  /orders?status=                 - Order listing
//! GET  /orders/{id}                    - Order detail
//! POST /orders/{id}/status             - Move order to the next status
//! ```

pub mod auth;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod taxonomy;
pub mod users;

use atelier_client::ApiError;
use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::error::Result;
use crate::middleware::{clear_current_admin, set_flash};
use crate::models::Flash;
use crate::state::AppState;

/// Create all routes for the admin console.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::dashboard))
        // Auth
        .route("/auth/login", get(auth::login_page).post(auth::login))
        .route("/auth/logout", post(auth::logout))
        // Products
        .route("/products", get(products::index).post(products::create))
        .route("/products/new", get(products::new))
        .route("/products/{id}", post(products::update))
        .route("/products/{id}/edit", get(products::edit))
        .route("/products/{id}/delete", post(products::delete))
        // Brands
        .route("/brands", get(taxonomy::brands).post(taxonomy::create_brand))
        .route("/brands/{id}", post(taxonomy::rename_brand))
        .route("/brands/{id}/delete", post(taxonomy::delete_brand))
        // Categories
        .route(
            "/categories",
            get(taxonomy::categories).post(taxonomy::create_category),
        )
        .route("/categories/{id}", post(taxonomy::rename_category))
        .route("/categories/{id}/delete", post(taxonomy::delete_category))
        // Users
        .route("/users", get(users::index))
        .route("/users/{id}/role", post(users::change_role))
        .route("/users/{id}/delete", post(users::delete))
        // Orders
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", post(orders::update_status))
}

/// Queue a flash message and redirect.
pub(crate) async fn redirect_with_flash(session: &Session, flash: Flash, to: &str) -> Response {
    if let Err(e) = set_flash(session, flash).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
    Redirect::to(to).into_response()
}

/// Turn an upstream failure into a response.
///
/// A rejected token means the backend session ended: sign the admin out and
/// send them to the login page instead of showing a bare 401.
pub(crate) async fn upstream_failure(session: &Session, err: ApiError) -> Result<Response> {
    if matches!(err, ApiError::Unauthorized(_)) {
        clear_current_admin(session).await?;
        return Ok(redirect_with_flash(
            session,
            Flash::error("Your session expired. Please sign in again."),
            "/auth/login",
        )
        .await);
    }
    Err(err.into())
}

/// Flash the outcome of a mutation and go back to `to`.
///
/// Validation and conflict errors from the backend are shown to the admin;
/// anything else propagates.
pub(crate) async fn flash_outcome(
    session: &Session,
    outcome: std::result::Result<String, ApiError>,
    to: &str,
) -> Result<Response> {
    match outcome {
        Ok(message) => Ok(redirect_with_flash(session, Flash::success(message), to).await),
        Err(err) if is_rejection(&err) => {
            Ok(redirect_with_flash(session, Flash::error(err.user_message()), to).await)
        }
        Err(err) => upstream_failure(session, err).await,
    }
}

/// The backend understood the request and said no.
pub(crate) const fn is_rejection(err: &ApiError) -> bool {
    match err {
        ApiError::Status { status, .. } => *status < 500,
        ApiError::NotFound(_) | ApiError::Forbidden(_) => true,
        _ => false,
    }
}
