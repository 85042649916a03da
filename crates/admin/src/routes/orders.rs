//! Order management: listing, detail and status changes.

use askama::Template;
use askama_web::WebTemplate;
use atelier_core::order::{Order, OrderItem};
use atelier_core::{OrderId, OrderStatus};
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::models::Flash;
use crate::routes::{flash_outcome, redirect_with_flash, upstream_failure};
use crate::state::AppState;
use crate::views::{DATE_FORMAT, SelectOption, Shell, status_class};

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
}

/// Order row for the listing table.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub id: i32,
    pub customer: String,
    pub email: String,
    pub items: u32,
    pub total: String,
    pub payment: &'static str,
    pub status_label: &'static str,
    pub status_class: String,
    pub created_at: String,
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i32(),
            customer: order.user.name.clone(),
            email: order.user.email.clone(),
            items: order.item_count(),
            total: order.total_price.to_string(),
            payment: order.payment_method.label(),
            status_label: order.status.label(),
            status_class: status_class(order.status),
            created_at: order.created_at.format(DATE_FORMAT).to_string(),
        }
    }
}

/// Line on the order detail page.
#[derive(Debug, Clone)]
pub struct ItemRow {
    pub product_id: i32,
    pub name: String,
    pub variant: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&OrderItem> for ItemRow {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id.as_i32(),
            name: item.name.clone(),
            variant: format!("{} / {}", item.size, item.color),
            quantity: item.quantity,
            unit_price: item.unit_price.to_string(),
            line_total: item.line_total().to_string(),
        }
    }
}

/// A status the order may move to, rendered as a button.
#[derive(Debug, Clone)]
pub struct TransitionButton {
    pub value: String,
    pub label: &'static str,
    pub danger: bool,
}

/// Orders list template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub shell: Shell,
    pub statuses: Vec<SelectOption>,
    pub orders: Vec<OrderRow>,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub shell: Shell,
    pub order: OrderRow,
    pub address: String,
    pub phone: String,
    pub items: Vec<ItemRow>,
    pub items_price: String,
    pub shipping_price: String,
    pub paid_at: Option<String>,
    pub delivered_at: Option<String>,
    pub transitions: Vec<TransitionButton>,
}

/// Status change form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Check that an order may move from `current` to `next`.
///
/// # Errors
///
/// Returns a message for the admin when the move is not allowed.
pub fn check_transition(
    current: OrderStatus,
    next: OrderStatus,
) -> std::result::Result<(), String> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(format!(
            "A {} order cannot be marked {}.",
            current.label().to_lowercase(),
            next.label().to_lowercase()
        ))
    }
}

fn status_options(selected: Option<OrderStatus>) -> Vec<SelectOption> {
    std::iter::once(SelectOption::new("", "All statuses", selected.is_none()))
        .chain(OrderStatus::ALL.into_iter().map(|status| {
            SelectOption::new(status.to_string(), status.label(), selected == Some(status))
        }))
        .collect()
}

/// Orders list handler.
#[instrument(skip(admin, state, session))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<OrdersQuery>,
) -> Result<Response> {
    // Unknown or empty filters show everything
    let status = query
        .status
        .as_deref()
        .and_then(|s| s.parse::<OrderStatus>().ok());

    let mut orders = match state.api().all_orders(status, &admin.token()).await {
        Ok(orders) => orders,
        Err(e) => return upstream_failure(&session, e).await,
    };
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let template = OrdersIndexTemplate {
        shell: Shell::load(&session, &admin, "/orders").await,
        statuses: status_options(status),
        orders: orders.iter().map(OrderRow::from).collect(),
    };
    Ok(template.into_response())
}

/// Order detail handler.
#[instrument(skip(admin, state, session))]
pub async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Response> {
    let order = match state.api().order(OrderId::new(id), &admin.token()).await {
        Ok(order) => order,
        Err(e) => return upstream_failure(&session, e).await,
    };

    let template = OrderShowTemplate {
        shell: Shell::load(&session, &admin, "/orders").await,
        order: OrderRow::from(&order),
        address: order.shipping_address.one_line(),
        phone: order.shipping_address.phone.clone(),
        items: order.items.iter().map(ItemRow::from).collect(),
        items_price: order.items_price.to_string(),
        shipping_price: order.shipping_price.to_string(),
        paid_at: order.paid_at.map(|at| at.format(DATE_FORMAT).to_string()),
        delivered_at: order
            .delivered_at
            .map(|at| at.format(DATE_FORMAT).to_string()),
        transitions: order
            .status
            .next_statuses()
            .into_iter()
            .map(|next| TransitionButton {
                value: next.to_string(),
                label: next.label(),
                danger: next == OrderStatus::Cancelled,
            })
            .collect(),
    };
    Ok(template.into_response())
}

/// Move an order to a new status.
#[instrument(skip(admin, state, session, form), fields(admin_id = %admin.id))]
pub async fn update_status(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<StatusForm>,
) -> Result<Response> {
    let id = OrderId::new(id);
    let back = format!("/orders/{id}");

    let Ok(next) = form.status.parse::<OrderStatus>() else {
        return Ok(redirect_with_flash(&session, Flash::error("Unknown status."), &back).await);
    };

    let token = admin.token();
    let order = match state.api().order(id, &token).await {
        Ok(order) => order,
        Err(e) => return upstream_failure(&session, e).await,
    };
    if let Err(message) = check_transition(order.status, next) {
        return Ok(redirect_with_flash(&session, Flash::error(message), &back).await);
    }

    let outcome = state
        .api()
        .update_order_status(id, next, &token)
        .await
        .map(|order| {
            info!(order_id = %id, status = %order.status, "Order status changed");
            format!("Order #{id} marked {}.", order.status.label().to_lowercase())
        });
    flash_outcome(&session, outcome, &back).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_check_transition() {
        assert!(check_transition(OrderStatus::Pending, OrderStatus::Paid).is_ok());
        assert!(check_transition(OrderStatus::Shipped, OrderStatus::Delivered).is_ok());

        let err = check_transition(OrderStatus::Delivered, OrderStatus::Pending).unwrap_err();
        assert_eq!(err, "A delivered order cannot be marked pending.");
        assert!(check_transition(OrderStatus::Shipped, OrderStatus::Cancelled).is_err());
    }

    #[test]
    fn test_status_options_mark_selection() {
        let options = status_options(Some(OrderStatus::Shipped));
        assert_eq!(options.len(), OrderStatus::ALL.len() + 1);
        assert!(!options[0].selected);
        let selected: Vec<_> = options.iter().filter(|o| o.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].value, "shipped");

        assert!(status_options(None)[0].selected);
    }
}
