//! Checkout route handlers.
//!
//! Only the selected cart lines are ordered. Purchased lines leave the cart;
//! the rest stay for later.

use askama::Template;
use askama_web::WebTemplate;
use atelier_client::ApiError;
use atelier_core::PaymentMethod;
use atelier_core::cart::Cart;
use atelier_core::order::{NewOrder, ShippingAddress};
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{RequireAuth, load_cart, save_cart};
use crate::models::{CurrentUser, Flash};
use crate::routes::cart::CartLineView;
use crate::routes::{redirect_with_flash, upstream_failure};
use crate::state::AppState;
use crate::views::{Layout, SelectOption};

const PAYMENT_METHODS: [PaymentMethod; 3] = [
    PaymentMethod::CashOnDelivery,
    PaymentMethod::PayPal,
    PaymentMethod::Stripe,
];

const fn payment_value(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::CashOnDelivery => "cash_on_delivery",
        PaymentMethod::PayPal => "paypal",
        PaymentMethod::Stripe => "stripe",
    }
}

/// Checkout form data.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub payment_method: String,
}

impl CheckoutForm {
    fn address(&self) -> ShippingAddress {
        ShippingAddress {
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            street: self.street.clone(),
            city: self.city.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone(),
        }
    }

    fn method(&self) -> PaymentMethod {
        self.payment_method.parse().unwrap_or_default()
    }
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub lines: Vec<CartLineView>,
    pub subtotal: String,
    pub shipping: String,
    pub total: String,
    pub form: CheckoutForm,
    pub payment_methods: Vec<SelectOption>,
    pub error: Option<String>,
}

async fn render(
    session: &Session,
    user: &CurrentUser,
    cart: &Cart,
    form: CheckoutForm,
    error: Option<String>,
) -> CheckoutTemplate {
    let method = form.method();
    CheckoutTemplate {
        layout: Layout::load(session, Some(user)).await,
        lines: cart.selected_lines().map(CartLineView::from).collect(),
        subtotal: cart.subtotal().to_string(),
        shipping: cart.shipping().to_string(),
        total: cart.total().to_string(),
        payment_methods: PAYMENT_METHODS
            .into_iter()
            .map(|m| SelectOption::new(payment_value(m), m.label(), m == method))
            .collect(),
        form,
        error,
    }
}

/// Display the checkout summary and address form.
#[instrument(skip(session, user), fields(user_id = %user.id))]
pub async fn show(session: Session, RequireAuth(user): RequireAuth) -> Result<Response> {
    let cart = load_cart(&session).await?;
    if cart.selected_count() == 0 {
        return Ok(redirect_with_flash(
            &session,
            Flash::info("Select at least one item to check out."),
            "/cart",
        )
        .await);
    }

    let form = CheckoutForm {
        full_name: user.name.clone(),
        ..CheckoutForm::default()
    };
    Ok(render(&session, &user, &cart, form, None).await.into_response())
}

/// Place the order.
///
/// PayPal and Stripe orders redirect to the provider's hosted page; cash on
/// delivery goes straight to the order page.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let mut cart = load_cart(&session).await?;

    let order = match NewOrder::from_cart(&cart, form.address(), form.method()) {
        Ok(order) => order,
        Err(e) => {
            let message = format!("Please check your order: {e}.");
            return Ok(render(&session, &user, &cart, form, Some(message))
                .await
                .into_response());
        }
    };

    let created = match state.api().create_order(&order, &user.token()).await {
        Ok(created) => created,
        Err(e @ ApiError::Unauthorized(_)) => return upstream_failure(&session, e).await,
        Err(e) if e.status().is_some_and(|s| s < 500) => {
            let message = e.user_message();
            return Ok(render(&session, &user, &cart, form, Some(message))
                .await
                .into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let purchased = cart.remove_selected();
    save_cart(&session, &cart).await?;
    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_id", &created.id.to_string())]),
    );
    info!(order_id = %created.id, lines = purchased.len(), "Checkout complete");

    if order.payment_method.redirects_to_provider()
        && let Some(url) = &created.payment_url
    {
        return Ok(Redirect::to(url).into_response());
    }

    Ok(redirect_with_flash(
        &session,
        Flash::success(format!("Order #{} placed. Thank you!", created.id)),
        &format!("/account/orders/{}", created.id),
    )
    .await)
}
