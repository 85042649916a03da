//! Cart route handlers.
//!
//! The cart lives in the visitor's session. Mutations use HTMX and answer
//! with the `cart_items` fragment plus an `HX-Trigger: cart-updated` header
//! so the header badge refreshes; plain form posts redirect back instead.

use askama::Template;
use askama_web::WebTemplate;
use atelier_core::ProductId;
use atelier_core::cart::{AddOutcome, Cart, CartLine, FREE_SHIPPING_THRESHOLD, LineKey};
use atelier_core::catalog::Product;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use futures::future::join_all;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{OptionalAuth, load_cart, save_cart};
use crate::models::Flash;
use crate::routes::{is_htmx, redirect_with_flash};
use crate::state::AppState;
use crate::views::{Layout, PLACEHOLDER_IMAGE};

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub product_id: i32,
    pub name: String,
    pub image: String,
    pub size: String,
    pub color: String,
    pub unit_price: String,
    pub quantity: u32,
    pub max_stock: u32,
    pub line_total: String,
    pub selected: bool,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.as_i32(),
            name: line.name.clone(),
            image: line
                .image
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            size: line.size.clone(),
            color: line.color.clone(),
            unit_price: line.unit_price.to_string(),
            quantity: line.quantity,
            max_stock: line.max_stock,
            line_total: line.line_total().to_string(),
            selected: line.selected,
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub selected_count: u32,
    pub all_selected: bool,
    pub subtotal: String,
    pub shipping: String,
    pub total: String,
    /// How much more to spend for free shipping, if anything is selected.
    pub free_shipping_gap: Option<String>,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let subtotal = cart.subtotal();
        let free_shipping_gap = (cart.selected_count() > 0 && subtotal < FREE_SHIPPING_THRESHOLD)
            .then(|| (FREE_SHIPPING_THRESHOLD - subtotal).to_string());

        Self {
            lines: cart.lines().iter().map(CartLineView::from).collect(),
            item_count: cart.item_count(),
            selected_count: cart.selected_count(),
            all_selected: cart.all_selected(),
            subtotal: subtotal.to_string(),
            shipping: cart.shipping().to_string(),
            total: cart.total().to_string(),
            free_shipping_gap,
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub cart: CartView,
    pub notices: Vec<String>,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Inline result of an add-to-cart (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_notice.html")]
pub struct CartNoticeTemplate {
    pub ok: bool,
    pub message: String,
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i32,
    pub size: String,
    pub color: String,
    pub quantity: Option<u32>,
}

/// Form data identifying one line.
#[derive(Debug, Deserialize)]
pub struct LineForm {
    pub product_id: i32,
    pub size: String,
    pub color: String,
}

impl LineForm {
    fn key(&self) -> LineKey {
        LineKey::new(ProductId::new(self.product_id), &self.size, &self.color)
    }
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: i32,
    pub size: String,
    pub color: String,
    pub quantity: u32,
}

/// Select-all form data. A checked box sends `selected=on`.
#[derive(Debug, Deserialize)]
pub struct SelectAllForm {
    pub selected: Option<String>,
}

/// Fresh product data for the cart's products.
///
/// Returns `None` when any lookup failed for a reason other than the product
/// being gone, so an outage never empties the cart.
async fn fresh_products(state: &AppState, ids: &[ProductId]) -> Option<Vec<Product>> {
    let results = join_all(ids.iter().map(|id| state.api().product(*id))).await;
    let mut products = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(product) => products.push(product),
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                warn!(error = %e, "Skipping cart refresh");
                return None;
            }
        }
    }
    Some(products)
}

/// Human-readable notices for what a refresh changed.
fn reconcile_notices(removed: usize, clamped: usize, repriced: usize) -> Vec<String> {
    let mut notices = Vec::new();
    if removed > 0 {
        notices.push(format!(
            "{removed} item(s) are no longer available and were removed."
        ));
    }
    if clamped > 0 {
        notices.push(format!(
            "{clamped} item(s) were reduced to the quantity left in stock."
        ));
    }
    if repriced > 0 {
        notices.push(format!("{repriced} item(s) changed price."));
    }
    notices
}

/// Respond to a cart mutation: fragment for HTMX, redirect otherwise.
fn cart_changed(headers: &HeaderMap, cart: &Cart) -> Response {
    if is_htmx(headers) {
        (
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartItemsTemplate {
                cart: CartView::from(cart),
            },
        )
            .into_response()
    } else {
        Redirect::to("/cart").into_response()
    }
}

/// Display cart page, re-synced against current product data.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<CartShowTemplate> {
    let mut cart = load_cart(&session).await?;
    let mut notices = Vec::new();

    if !cart.is_empty()
        && let Some(products) = fresh_products(&state, &cart.product_ids()).await
    {
        let report = cart.reconcile(&products);
        if !report.is_empty() {
            notices = reconcile_notices(
                report.removed.len(),
                report.clamped.len(),
                report.repriced.len(),
            );
            save_cart(&session, &cart).await?;
        }
    }

    Ok(CartShowTemplate {
        layout: Layout::load(&session, user.as_ref()).await,
        cart: CartView::from(&cart),
        notices,
    })
}

/// Add item to cart.
///
/// Uses fresh product data so price and stock limits are current.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product = state.api().product(ProductId::new(form.product_id)).await?;
    let mut cart = load_cart(&session).await?;
    let back = format!("/products/{}", form.product_id);

    let outcome = cart.add(
        &product,
        &form.size,
        &form.color,
        form.quantity.unwrap_or(1),
    );

    let (ok, message) = match outcome {
        Ok(AddOutcome::Added | AddOutcome::Merged) => {
            save_cart(&session, &cart).await?;
            add_breadcrumb(
                "cart",
                "Added to cart",
                Some(&[("product_id", &form.product_id.to_string())]),
            );
            (true, format!("Added {} to your cart.", product.name))
        }
        Ok(AddOutcome::Clamped { quantity }) => {
            save_cart(&session, &cart).await?;
            (
                true,
                format!("Only {quantity} available; your cart now holds {quantity}."),
            )
        }
        Err(e) => (false, e.to_string()),
    };

    if is_htmx(&headers) {
        let notice = CartNoticeTemplate { ok, message };
        return Ok(if ok {
            (AppendHeaders([("HX-Trigger", "cart-updated")]), notice).into_response()
        } else {
            notice.into_response()
        });
    }

    let flash = if ok {
        Flash::success(message)
    } else {
        Flash::error(message)
    };
    Ok(redirect_with_flash(&session, flash, if ok { "/cart" } else { &back }).await)
}

/// Update cart line quantity. Zero removes the line.
#[instrument(skip(session, headers))]
pub async fn update(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let mut cart = load_cart(&session).await?;
    let key = LineKey::new(ProductId::new(form.product_id), &form.size, &form.color);
    cart.set_quantity(&key, form.quantity)?;
    save_cart(&session, &cart).await?;
    Ok(cart_changed(&headers, &cart))
}

/// Remove a cart line.
#[instrument(skip(session, headers))]
pub async fn remove(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<LineForm>,
) -> Result<Response> {
    let mut cart = load_cart(&session).await?;
    cart.remove(&form.key())?;
    save_cart(&session, &cart).await?;
    Ok(cart_changed(&headers, &cart))
}

/// Toggle whether a line is included in checkout.
#[instrument(skip(session, headers))]
pub async fn toggle(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<LineForm>,
) -> Result<Response> {
    let mut cart = load_cart(&session).await?;
    cart.toggle_selected(&form.key())?;
    save_cart(&session, &cart).await?;
    Ok(cart_changed(&headers, &cart))
}

/// Select or clear every line.
#[instrument(skip(session, headers))]
pub async fn select_all(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<SelectAllForm>,
) -> Result<Response> {
    let mut cart = load_cart(&session).await?;
    cart.select_all(form.selected.is_some());
    save_cart(&session, &cart).await?;
    Ok(cart_changed(&headers, &cart))
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> Result<CartCountTemplate> {
    let cart = load_cart(&session).await?;
    Ok(CartCountTemplate {
        count: cart.item_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_notices() {
        assert!(reconcile_notices(0, 0, 0).is_empty());
        let notices = reconcile_notices(1, 0, 2);
        assert_eq!(notices.len(), 2);
        assert!(notices[0].contains("removed"));
        assert!(notices[1].contains("changed price"));
    }

    #[test]
    fn test_empty_cart_view() {
        let view = CartView::from(&Cart::new());
        assert!(view.lines.is_empty());
        assert_eq!(view.total, "$0.00");
        assert!(view.free_shipping_gap.is_none());
    }
}
