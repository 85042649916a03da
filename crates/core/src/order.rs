//! Orders and the checkout request built from the cart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::Cart;
use crate::types::{CategoryId, Money, OrderId, OrderStatus, PaymentMethod, ProductId, UserId};

/// Errors building an order request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("select at least one item to check out")]
    NothingSelected,
    #[error("shipping address is missing {0}")]
    MissingAddressField(&'static str),
}

/// Where an order ships.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Trim every field and make sure none is blank.
    ///
    /// # Errors
    ///
    /// Names the first blank field.
    pub fn validated(self) -> Result<Self, OrderError> {
        let address = Self {
            full_name: self.full_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            street: self.street.trim().to_string(),
            city: self.city.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country: self.country.trim().to_string(),
        };

        for (name, value) in [
            ("full name", &address.full_name),
            ("phone", &address.phone),
            ("street", &address.street),
            ("city", &address.city),
            ("postal code", &address.postal_code),
            ("country", &address.country),
        ] {
            if value.is_empty() {
                return Err(OrderError::MissingAddressField(name));
            }
        }

        Ok(address)
    }

    /// One-line rendering for tables.
    #[must_use]
    pub fn one_line(&self) -> String {
        format!(
            "{}, {} {}, {}",
            self.street, self.postal_code, self.city, self.country
        )
    }
}

/// Buyer as embedded in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// A purchased line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub size: String,
    pub color: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// An order as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user: OrderUser,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub items_price: Money,
    pub shipping_price: Money,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    /// Hosted payment page for PayPal/Stripe orders awaiting payment.
    #[serde(default)]
    pub payment_url: Option<String>,
}

impl Order {
    /// Units across all items.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// A line in a new order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub size: String,
    pub color: String,
    pub quantity: u32,
}

/// The checkout request sent to the backend.
///
/// Prices are informational; the backend re-prices every line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub items: Vec<NewOrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub items_price: Money,
    pub shipping_price: Money,
    pub total_price: Money,
}

impl NewOrder {
    /// Build an order from the selected cart lines.
    ///
    /// # Errors
    ///
    /// Fails when nothing is selected or the address is incomplete.
    pub fn from_cart(
        cart: &Cart,
        address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Result<Self, OrderError> {
        let items: Vec<NewOrderItem> = cart
            .selected_lines()
            .map(|line| NewOrderItem {
                product_id: line.product_id,
                size: line.size.clone(),
                color: line.color.clone(),
                quantity: line.quantity,
            })
            .collect();

        if items.is_empty() {
            return Err(OrderError::NothingSelected);
        }

        Ok(Self {
            items,
            shipping_address: address.validated()?,
            payment_method,
            items_price: cart.subtotal(),
            shipping_price: cart.shipping(),
            total_price: cart.total(),
        })
    }
}
