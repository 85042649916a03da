//! Client-owned shopping cart.
//!
//! Lines are keyed by `(product, size, color)`: adding the same variant twice
//! merges into one line. Each line carries a `selected` flag so a shopper can
//! check out part of the cart and keep the rest for later. Quantities never
//! exceed the stock snapshot taken from the product.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Product;
use crate::types::{Money, ProductId};

/// Subtotal at which shipping becomes free.
pub const FREE_SHIPPING_THRESHOLD: Money = Money::from_cents(10_000);

/// Flat shipping fee below the threshold.
pub const FLAT_SHIPPING_FEE: Money = Money::from_cents(1_000);

/// Errors for rejected cart operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("{product} is not available in size {size} / {color}")]
    UnknownVariant {
        product: String,
        size: String,
        color: String,
    },
    #[error("{product} in size {size} / {color} is sold out")]
    OutOfStock {
        product: String,
        size: String,
        color: String,
    },
    #[error("item is not in the cart")]
    LineNotFound,
}

/// Identity of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub product_id: ProductId,
    pub size: String,
    pub color: String,
}

impl LineKey {
    #[must_use]
    pub fn new(product_id: ProductId, size: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            product_id,
            size: size.into(),
            color: color.into(),
        }
    }
}

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub size: String,
    pub color: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub max_stock: u32,
    pub selected: bool,
}

impl CartLine {
    /// Key identifying this line.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id, &self.size, &self.color)
    }

    fn matches(&self, key: &LineKey) -> bool {
        self.product_id == key.product_id && self.size == key.size && self.color == key.color
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Result of a successful [`Cart::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was created.
    Added,
    /// The quantity was added to an existing line.
    Merged,
    /// Stock ran out before the full quantity fit; the line holds `quantity`.
    Clamped { quantity: u32 },
}

/// What [`Cart::reconcile`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Lines dropped because the product or variant is gone or sold out.
    pub removed: Vec<LineKey>,
    /// Lines whose quantity was reduced to the available stock.
    pub clamped: Vec<LineKey>,
    /// Lines whose unit price changed.
    pub repriced: Vec<LineKey>,
}

impl ReconcileReport {
    /// Whether anything changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.clamped.is_empty() && self.repriced.is_empty()
    }
}

/// The shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Selected lines in insertion order.
    pub fn selected_lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter().filter(|l| l.selected)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Look up a line.
    #[must_use]
    pub fn line(&self, key: &LineKey) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.matches(key))
    }

    fn line_mut(&mut self, key: &LineKey) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.matches(key))
    }

    /// Add `quantity` units of a product variant.
    ///
    /// # Errors
    ///
    /// Fails for a zero quantity, a size/color the product does not offer,
    /// or a variant with no stock left.
    pub fn add(
        &mut self,
        product: &Product,
        size: &str,
        color: &str,
        quantity: u32,
    ) -> Result<AddOutcome, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        let variant = product
            .variant(size, color)
            .ok_or_else(|| CartError::UnknownVariant {
                product: product.name.clone(),
                size: size.to_string(),
                color: color.to_string(),
            })?;

        if variant.stock == 0 {
            return Err(CartError::OutOfStock {
                product: product.name.clone(),
                size: size.to_string(),
                color: color.to_string(),
            });
        }

        let stock = variant.stock;
        let key = LineKey::new(product.id, size, color);

        if let Some(line) = self.line_mut(&key) {
            let wanted = line.quantity.saturating_add(quantity);
            line.unit_price = product.sale_price();
            line.max_stock = stock;
            line.quantity = wanted.min(stock);
            return Ok(if wanted > stock {
                AddOutcome::Clamped {
                    quantity: line.quantity,
                }
            } else {
                AddOutcome::Merged
            });
        }

        let stored = quantity.min(stock);
        self.lines.push(CartLine {
            product_id: product.id,
            name: product.name.clone(),
            image: product.primary_image().map(str::to_string),
            size: size.to_string(),
            color: color.to_string(),
            unit_price: product.sale_price(),
            quantity: stored,
            max_stock: stock,
            selected: true,
        });

        Ok(if quantity > stock {
            AddOutcome::Clamped { quantity: stored }
        } else {
            AddOutcome::Added
        })
    }

    /// Set a line's quantity. Zero removes the line; larger values are
    /// clamped to the stock snapshot. Returns the stored quantity.
    ///
    /// # Errors
    ///
    /// Fails when the line does not exist.
    pub fn set_quantity(&mut self, key: &LineKey, quantity: u32) -> Result<u32, CartError> {
        if quantity == 0 {
            self.remove(key)?;
            return Ok(0);
        }
        let line = self.line_mut(key).ok_or(CartError::LineNotFound)?;
        line.quantity = quantity.min(line.max_stock).max(1);
        Ok(line.quantity)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Fails when the line does not exist.
    pub fn remove(&mut self, key: &LineKey) -> Result<CartLine, CartError> {
        let index = self
            .lines
            .iter()
            .position(|l| l.matches(key))
            .ok_or(CartError::LineNotFound)?;
        Ok(self.lines.remove(index))
    }

    /// Flip a line's `selected` flag, returning the new value.
    ///
    /// # Errors
    ///
    /// Fails when the line does not exist.
    pub fn toggle_selected(&mut self, key: &LineKey) -> Result<bool, CartError> {
        let line = self.line_mut(key).ok_or(CartError::LineNotFound)?;
        line.selected = !line.selected;
        Ok(line.selected)
    }

    /// Select or deselect every line.
    pub fn select_all(&mut self, selected: bool) {
        for line in &mut self.lines {
            line.selected = selected;
        }
    }

    /// Whether every line is selected (false for an empty cart).
    #[must_use]
    pub fn all_selected(&self) -> bool {
        !self.lines.is_empty() && self.lines.iter().all(|l| l.selected)
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Drop the selected lines (they were just ordered) and return them.
    pub fn remove_selected(&mut self) -> Vec<CartLine> {
        let (ordered, kept) = std::mem::take(&mut self.lines)
            .into_iter()
            .partition(|l| l.selected);
        self.lines = kept;
        ordered
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Total units across selected lines.
    #[must_use]
    pub fn selected_count(&self) -> u32 {
        self.selected_lines().map(|l| l.quantity).sum()
    }

    /// Sum of selected line totals.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.selected_lines().map(CartLine::line_total).sum()
    }

    /// Shipping for the selected lines.
    #[must_use]
    pub fn shipping(&self) -> Money {
        let subtotal = self.subtotal();
        if self.selected_count() == 0 || subtotal >= FREE_SHIPPING_THRESHOLD {
            Money::ZERO
        } else {
            FLAT_SHIPPING_FEE
        }
    }

    /// Subtotal plus shipping.
    #[must_use]
    pub fn total(&self) -> Money {
        self.subtotal() + self.shipping()
    }

    /// Re-sync every line against fresh product data.
    ///
    /// Products missing from `products` are treated as deleted.
    pub fn reconcile(&mut self, products: &[Product]) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        self.lines.retain_mut(|line| {
            let key = line.key();
            let Some(product) = products.iter().find(|p| p.id == line.product_id) else {
                report.removed.push(key);
                return false;
            };
            let stock = product.stock_for(&line.size, &line.color);
            if stock == 0 {
                report.removed.push(key);
                return false;
            }

            let price = product.sale_price();
            if price != line.unit_price {
                line.unit_price = price;
                report.repriced.push(key.clone());
            }
            if line.quantity > stock {
                line.quantity = stock;
                report.clamped.push(key);
            }
            line.max_stock = stock;
            line.name.clone_from(&product.name);
            true
        });

        report
    }

    /// Distinct product IDs in the cart.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.lines.iter().map(|l| l.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::tests::product;

    fn tee() -> Product {
        product(1, 1, &[("M", "black", 3), ("L", "black", 10), ("S", "white", 0)])
    }

    #[test]
    fn test_add_creates_selected_line() {
        let mut cart = Cart::new();
        let outcome = cart.add(&tee(), "M", "black", 2).unwrap();
        assert_eq!(outcome, AddOutcome::Added);
        assert_eq!(cart.lines().len(), 1);
        let line = &cart.lines()[0];
        assert!(line.selected);
        assert_eq!(line.quantity, 2);
        assert_eq!(line.max_stock, 3);
        assert_eq!(line.image.as_deref(), Some("/img/1.jpg"));
    }

    #[test]
    fn test_add_same_variant_merges() {
        let mut cart = Cart::new();
        cart.add(&tee(), "L", "black", 2).unwrap();
        let outcome = cart.add(&tee(), "L", "black", 3).unwrap();
        assert_eq!(outcome, AddOutcome::Merged);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_add_other_variant_is_separate_line() {
        let mut cart = Cart::new();
        cart.add(&tee(), "L", "black", 1).unwrap();
        cart.add(&tee(), "M", "black", 1).unwrap();
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.product_ids(), vec![ProductId::new(1)]);
    }

    #[test]
    fn test_add_clamps_to_stock() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.add(&tee(), "M", "black", 5).unwrap(),
            AddOutcome::Clamped { quantity: 3 }
        );
        assert_eq!(
            cart.add(&tee(), "M", "black", 1).unwrap(),
            AddOutcome::Clamped { quantity: 3 }
        );
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_add_rejections() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(&tee(), "M", "black", 0), Err(CartError::ZeroQuantity));
        assert!(matches!(
            cart.add(&tee(), "XL", "black", 1),
            Err(CartError::UnknownVariant { .. })
        ));
        assert!(matches!(
            cart.add(&tee(), "S", "white", 1),
            Err(CartError::OutOfStock { .. })
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_clamps_and_removes() {
        let mut cart = Cart::new();
        cart.add(&tee(), "M", "black", 1).unwrap();
        let key = LineKey::new(ProductId::new(1), "M", "black");

        assert_eq!(cart.set_quantity(&key, 99).unwrap(), 3);
        assert_eq!(cart.set_quantity(&key, 0).unwrap(), 0);
        assert!(cart.is_empty());
        assert_eq!(cart.set_quantity(&key, 1), Err(CartError::LineNotFound));
    }

    #[test]
    fn test_selection_drives_totals() {
        let mut cart = Cart::new();
        cart.add(&tee(), "L", "black", 1).unwrap(); // 50.00
        cart.add(&tee(), "M", "black", 1).unwrap(); // 50.00

        assert_eq!(cart.subtotal(), Money::from_cents(10_000));
        assert_eq!(cart.shipping(), Money::ZERO);

        let key = LineKey::new(ProductId::new(1), "M", "black");
        assert!(!cart.toggle_selected(&key).unwrap());
        assert_eq!(cart.selected_count(), 1);
        assert_eq!(cart.subtotal(), Money::from_cents(5_000));
        assert_eq!(cart.shipping(), FLAT_SHIPPING_FEE);
        assert_eq!(cart.total(), Money::from_cents(6_000));
        assert!(!cart.all_selected());

        cart.select_all(false);
        assert_eq!(cart.total(), Money::ZERO);
        cart.select_all(true);
        assert!(cart.all_selected());
    }

    #[test]
    fn test_remove_selected_keeps_the_rest() {
        let mut cart = Cart::new();
        cart.add(&tee(), "L", "black", 1).unwrap();
        cart.add(&tee(), "M", "black", 2).unwrap();
        cart.toggle_selected(&LineKey::new(ProductId::new(1), "M", "black"))
            .unwrap();

        let ordered = cart.remove_selected();
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].size, "L");
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].size, "M");
    }

    #[test]
    fn test_reconcile_reprices_clamps_and_drops() {
        let mut cart = Cart::new();
        cart.add(&tee(), "L", "black", 8).unwrap();
        cart.add(&tee(), "M", "black", 2).unwrap();
        cart.add(&product(2, 2, &[("M", "red", 4)]), "M", "red", 1).unwrap();

        let mut fresh = product(1, 1, &[("L", "black", 5), ("M", "black", 0)]);
        fresh.discount_percent = 10;

        let report = cart.reconcile(&[fresh]);

        let l = LineKey::new(ProductId::new(1), "L", "black");
        assert_eq!(report.clamped, vec![l.clone()]);
        assert_eq!(report.repriced, vec![l.clone()]);
        assert_eq!(report.removed.len(), 2);
        assert_eq!(cart.lines().len(), 1);

        let line = cart.line(&l).unwrap();
        assert_eq!(line.quantity, 5);
        assert_eq!(line.unit_price, Money::from_cents(4_500));
    }

    #[test]
    fn test_reconcile_no_changes() {
        let mut cart = Cart::new();
        cart.add(&tee(), "L", "black", 1).unwrap();
        assert!(cart.reconcile(&[tee()]).is_empty());
    }

    #[test]
    fn test_session_roundtrip_shape() {
        let mut cart = Cart::new();
        cart.add(&tee(), "L", "black", 1).unwrap();
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json["lines"][0]["size"], "L");
        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }
}
