//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use atelier_client::ApiError;
use atelier_core::order::Order;
use atelier_core::{OrderId, OrderStatus, ProductId};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::routes::{is_htmx, redirect_with_flash, upstream_failure};
use crate::state::AppState;
use crate::views::{Layout, PLACEHOLDER_IMAGE, ProductCard};

/// Order row in the history list.
#[derive(Clone)]
pub struct OrderSummaryView {
    pub id: i32,
    pub date: String,
    pub status: &'static str,
    pub status_class: String,
    pub item_count: u32,
    pub total: String,
}

fn status_class(status: OrderStatus) -> String {
    format!("status-{status}")
}

impl From<&Order> for OrderSummaryView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i32(),
            date: order.created_at.format("%b %-d, %Y").to_string(),
            status: order.status.label(),
            status_class: status_class(order.status),
            item_count: order.item_count(),
            total: order.total_price.to_string(),
        }
    }
}

/// Line on the order detail page.
#[derive(Clone)]
pub struct OrderItemView {
    pub product_id: i32,
    pub name: String,
    pub image: String,
    pub size: String,
    pub color: String,
    pub unit_price: String,
    pub quantity: u32,
    pub line_total: String,
}

/// Order detail display data.
#[derive(Clone)]
pub struct OrderDetailView {
    pub summary: OrderSummaryView,
    pub items: Vec<OrderItemView>,
    pub ship_to: String,
    pub ship_to_name: String,
    pub payment_method: &'static str,
    pub items_price: String,
    pub shipping_price: String,
    /// Link to finish paying, while the order still awaits payment.
    pub pay_url: Option<String>,
    pub paid_on: Option<String>,
    pub delivered_on: Option<String>,
}

impl From<&Order> for OrderDetailView {
    fn from(order: &Order) -> Self {
        Self {
            summary: OrderSummaryView::from(order),
            items: order
                .items
                .iter()
                .map(|item| OrderItemView {
                    product_id: item.product_id.as_i32(),
                    name: item.name.clone(),
                    image: item
                        .image
                        .clone()
                        .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
                    size: item.size.clone(),
                    color: item.color.clone(),
                    unit_price: item.unit_price.to_string(),
                    quantity: item.quantity,
                    line_total: item.line_total().to_string(),
                })
                .collect(),
            ship_to: order.shipping_address.one_line(),
            ship_to_name: order.shipping_address.full_name.clone(),
            payment_method: order.payment_method.label(),
            items_price: order.items_price.to_string(),
            shipping_price: order.shipping_price.to_string(),
            pay_url: (order.status == OrderStatus::Pending)
                .then(|| order.payment_url.clone())
                .flatten(),
            paid_on: order.paid_at.map(|d| d.format("%b %-d, %Y").to_string()),
            delivered_on: order
                .delivered_at
                .map(|d| d.format("%b %-d, %Y").to_string()),
        }
    }
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderSummaryView>,
}

/// Order detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/order.html")]
pub struct OrderTemplate {
    pub layout: Layout,
    pub order: OrderDetailView,
}

/// Favorites page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/favorites.html")]
pub struct FavoritesTemplate {
    pub layout: Layout,
    pub products: Vec<ProductCard>,
}

/// Favorite toggle button fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/favorite_button.html")]
pub struct FavoriteButtonTemplate {
    pub product_id: i32,
    pub is_favorite: bool,
}

/// Display order history, newest first.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let mut orders = match state.api().my_orders(&user.token()).await {
        Ok(orders) => orders,
        Err(e) => return upstream_failure(&session, e).await,
    };
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(OrdersTemplate {
        layout: Layout::load(&session, Some(&user)).await,
        orders: orders.iter().map(OrderSummaryView::from).collect(),
    }
    .into_response())
}

/// Display one of the user's orders.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn order(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Response> {
    let order = match state.api().order(OrderId::new(id), &user.token()).await {
        Ok(order) => order,
        // Someone else's order reads as missing
        Err(ApiError::Forbidden(_)) => return Err(AppError::NotFound(format!("order {id}"))),
        Err(e) => return upstream_failure(&session, e).await,
    };

    if order.user.id != user.id {
        return Err(AppError::NotFound(format!("order {id}")));
    }

    Ok(OrderTemplate {
        layout: Layout::load(&session, Some(&user)).await,
        order: OrderDetailView::from(&order),
    }
    .into_response())
}

/// Display favorite products.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn favorites(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let favorites = match state.api().favorites(user.id, &user.token()).await {
        Ok(favorites) => favorites,
        Err(e) => return upstream_failure(&session, e).await,
    };

    Ok(FavoritesTemplate {
        layout: Layout::load(&session, Some(&user)).await,
        products: favorites.iter().map(ProductCard::from).collect(),
    }
    .into_response())
}

/// Add or remove a product from favorites.
#[instrument(skip(state, session, user, headers), fields(user_id = %user.id))]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<Response> {
    let product = ProductId::new(id);
    let token = user.token();
    let current = match state.api().favorites(user.id, &token).await {
        Ok(current) => current,
        Err(e) => return upstream_failure(&session, e).await,
    };
    let was_favorite = current.iter().any(|p| p.id == product);

    let toggled = if was_favorite {
        state.api().remove_favorite(user.id, product, &token).await
    } else {
        state.api().add_favorite(user.id, product, &token).await
    };
    if let Err(e) = toggled {
        return upstream_failure(&session, e).await;
    }
    info!(product_id = %product, favorite = !was_favorite, "Favorite toggled");

    if is_htmx(&headers) {
        return Ok(FavoriteButtonTemplate {
            product_id: id,
            is_favorite: !was_favorite,
        }
        .into_response());
    }

    let message = if was_favorite {
        "Removed from favorites."
    } else {
        "Saved to favorites."
    };
    Ok(redirect_with_flash(&session, Flash::success(message), &format!("/products/{id}")).await)
}
