//! Display data shared by every page template.

use atelier_core::catalog::Product;
use atelier_core::recommend::Recommendation;
use tower_sessions::Session;

use crate::middleware::{load_cart, take_flash};
use crate::models::CurrentUser;

/// Image shown when a product has none.
pub const PLACEHOLDER_IMAGE: &str = "/static/img/placeholder.svg";

/// A pending one-shot message.
#[derive(Clone)]
pub struct FlashView {
    pub class: &'static str,
    pub message: String,
}

/// Header and chrome data for `base.html`.
#[derive(Clone, Default)]
pub struct Layout {
    pub user_name: Option<String>,
    pub cart_count: u32,
    pub flash: Option<FlashView>,
}

impl Layout {
    /// Build the page chrome, consuming any pending flash message.
    pub async fn load(session: &Session, user: Option<&CurrentUser>) -> Self {
        let cart_count = load_cart(session)
            .await
            .map(|cart| cart.item_count())
            .unwrap_or_default();
        let flash = take_flash(session).await.map(|flash| FlashView {
            class: flash.kind.css_class(),
            message: flash.message,
        });

        Self {
            user_name: user.map(|u| u.first_name().to_string()),
            cart_count,
            flash,
        }
    }
}

/// Product tile for grids and recommendation panels.
#[derive(Clone)]
pub struct ProductCard {
    pub id: i32,
    pub name: String,
    pub brand: String,
    pub image: String,
    pub price: String,
    pub original_price: Option<String>,
    pub discount_percent: u8,
    pub rating: f32,
    pub review_count: u32,
    pub in_stock: bool,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            brand: product.brand.name.clone(),
            image: product
                .primary_image()
                .unwrap_or(PLACEHOLDER_IMAGE)
                .to_string(),
            price: product.sale_price().to_string(),
            original_price: product.on_sale().then(|| product.price.to_string()),
            discount_percent: product.discount_percent,
            rating: product.rating,
            review_count: product.review_count,
            in_stock: product.in_stock(),
        }
    }
}

impl From<&Recommendation> for ProductCard {
    fn from(rec: &Recommendation) -> Self {
        Self::from(&rec.product)
    }
}

/// One option in a `<select>`.
#[derive(Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            selected,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use atelier_core::cart::Cart;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::middleware::{save_cart, set_flash};
    use crate::models::Flash;

    fn product(discount: u8) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": 3,
            "name": "Wool Coat",
            "description": "",
            "brand": {"id": 1, "name": "Nordic"},
            "category": {"id": 2, "name": "Coats"},
            "price": "200.00",
            "discount_percent": discount,
            "images": [],
            "variants": [{"size": "M", "color": "grey", "stock": 2}],
            "rating": 4.5,
            "review_count": 8,
            "created_at": "2026-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_card_shows_sale_price() {
        let card = ProductCard::from(&product(25));
        assert_eq!(card.price, "$150.00");
        assert_eq!(card.original_price.as_deref(), Some("$200.00"));
        assert_eq!(card.image, PLACEHOLDER_IMAGE);
        assert!(card.in_stock);
    }

    #[test]
    fn test_card_without_discount() {
        let card = ProductCard::from(&product(0));
        assert_eq!(card.price, "$200.00");
        assert!(card.original_price.is_none());
    }

    #[tokio::test]
    async fn test_layout_takes_flash_and_counts_cart() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let mut cart = Cart::new();
        cart.add(&product(0), "M", "grey", 2).unwrap();
        save_cart(&session, &cart).await.unwrap();
        set_flash(&session, Flash::error("Nope")).await.unwrap();

        let layout = Layout::load(&session, None).await;
        assert_eq!(layout.cart_count, 2);
        assert_eq!(layout.flash.unwrap().class, "alert-error");
        assert!(Layout::load(&session, None).await.flash.is_none());
    }
}
