//! Catalog records mirrored from the backend.
//!
//! Products carry their stock per `(size, color)` variant. The helpers here
//! answer the questions the product page and the cart ask of that grid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BrandId, CategoryId, Money, ProductId, ReviewId, UserId};

/// Default number of products per listing page.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Largest page size a listing may request.
pub const MAX_PAGE_SIZE: u32 = 60;

/// Brand as embedded in a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandRef {
    pub id: BrandId,
    pub name: String,
}

/// Category as embedded in a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
}

/// A brand record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    #[serde(default)]
    pub product_count: u32,
}

/// A category record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub product_count: u32,
}

/// One purchasable size/color combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub size: String,
    pub color: String,
    pub stock: u32,
}

/// A product with its variant grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// URL-friendly name; older backend records may lack one.
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub brand: BrandRef,
    pub category: CategoryRef,
    pub price: Money,
    #[serde(default)]
    pub discount_percent: u8,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub review_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Price after the product's discount.
    #[must_use]
    pub fn sale_price(&self) -> Money {
        self.price.discounted(self.discount_percent)
    }

    /// Whether the product is currently discounted.
    #[must_use]
    pub const fn on_sale(&self) -> bool {
        self.discount_percent > 0
    }

    /// First image, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Units in stock across all variants.
    #[must_use]
    pub fn total_stock(&self) -> u32 {
        self.variants.iter().map(|v| v.stock).sum()
    }

    /// Whether any variant can be bought.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.variants.iter().any(|v| v.stock > 0)
    }

    /// Look up the variant for a size/color pair.
    #[must_use]
    pub fn variant(&self, size: &str, color: &str) -> Option<&Variant> {
        self.variants
            .iter()
            .find(|v| v.size == size && v.color == color)
    }

    /// Stock for a size/color pair, zero when the pair does not exist.
    #[must_use]
    pub fn stock_for(&self, size: &str, color: &str) -> u32 {
        self.variant(size, color).map_or(0, |v| v.stock)
    }

    /// Distinct sizes in the order the backend lists them.
    #[must_use]
    pub fn sizes(&self) -> Vec<&str> {
        distinct(self.variants.iter().map(|v| v.size.as_str()))
    }

    /// Distinct colors in the order the backend lists them.
    #[must_use]
    pub fn colors(&self) -> Vec<&str> {
        distinct(self.variants.iter().map(|v| v.color.as_str()))
    }

    /// Colors that can be bought in the given size.
    #[must_use]
    pub fn colors_for_size(&self, size: &str) -> Vec<&str> {
        distinct(
            self.variants
                .iter()
                .filter(|v| v.size == size && v.stock > 0)
                .map(|v| v.color.as_str()),
        )
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

/// A customer review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub author: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregated review numbers for a product page.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingSummary {
    pub count: usize,
    /// Average rating rounded to one decimal place.
    pub average: f32,
    /// Counts for 5, 4, 3, 2 and 1 stars, in that order.
    pub histogram: [usize; 5],
}

impl RatingSummary {
    /// Summarize a list of reviews. Ratings outside 1..=5 are clamped.
    #[must_use]
    pub fn from_reviews(reviews: &[Review]) -> Self {
        let mut histogram = [0usize; 5];
        let mut total = 0u32;

        for review in reviews {
            let rating = review.rating.clamp(1, 5);
            total += u32::from(rating);
            if let Some(slot) = histogram.get_mut(usize::from(5 - rating)) {
                *slot += 1;
            }
        }

        let count = reviews.len();
        #[allow(clippy::cast_precision_loss)] // review counts stay far below f32 precision
        let average = if count == 0 {
            0.0
        } else {
            ((total as f32 / count as f32) * 10.0).round() / 10.0
        };

        Self {
            count,
            average,
            histogram,
        }
    }
}

/// A page of results from a listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub pages: u32,
    pub total: u64,
}

impl<T> Page<T> {
    /// An empty first page.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            pages: 1,
            total: 0,
        }
    }

    /// Whether a following page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.pages
    }

    /// Whether a preceding page exists.
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }
}

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Rating,
}

impl SortOrder {
    /// Every sort order with its label, for select boxes.
    pub const OPTIONS: [(Self, &'static str); 4] = [
        (Self::Newest, "Newest"),
        (Self::PriceAsc, "Price: low to high"),
        (Self::PriceDesc, "Price: high to low"),
        (Self::Rating, "Top rated"),
    ];

    /// Wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Rating => "rating",
        }
    }
}

/// Filters for the product listing, sent to the backend as a query string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ProductQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<BrandId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Money>,
    #[serde(default)]
    pub sort: SortOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl ProductQuery {
    /// Clean up user-supplied filters before they reach the backend or a
    /// cache key: page >= 1, page size within bounds, blank keyword dropped,
    /// inverted price range swapped.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.keyword = self
            .keyword
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self.page = Some(self.page.unwrap_or(1).max(1));
        self.page_size = Some(
            self.page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        );
        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            self.min_price = Some(max);
            self.max_price = Some(min);
        }
        self
    }

    /// Same filters on another page.
    #[must_use]
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: Some(page),
            ..self.clone()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub fn product(id: i32, category: i32, variants: &[(&str, &str, u32)]) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            slug: format!("product-{id}"),
            description: String::new(),
            brand: BrandRef {
                id: BrandId::new(1),
                name: "Maison".to_string(),
            },
            category: CategoryRef {
                id: CategoryId::new(category),
                name: format!("Category {category}"),
            },
            price: Money::from_cents(5000),
            discount_percent: 0,
            images: vec![format!("/img/{id}.jpg")],
            variants: variants
                .iter()
                .map(|(size, color, stock)| Variant {
                    size: (*size).to_string(),
                    color: (*color).to_string(),
                    stock: *stock,
                })
                .collect(),
            rating: 0.0,
            review_count: 0,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn review(rating: u8) -> Review {
        Review {
            id: ReviewId::new(1),
            product_id: ProductId::new(1),
            user_id: UserId::new(1),
            author: "A".to_string(),
            rating,
            comment: String::new(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_variant_grid_queries() {
        let p = product(
            1,
            1,
            &[("M", "black", 2), ("M", "white", 0), ("L", "black", 5), ("S", "red", 1)],
        );
        assert_eq!(p.sizes(), vec!["M", "L", "S"]);
        assert_eq!(p.colors(), vec!["black", "white", "red"]);
        assert_eq!(p.colors_for_size("M"), vec!["black"]);
        assert_eq!(p.stock_for("L", "black"), 5);
        assert_eq!(p.stock_for("XL", "black"), 0);
        assert_eq!(p.total_stock(), 8);
        assert!(p.in_stock());
    }

    #[test]
    fn test_out_of_stock_product() {
        let p = product(1, 1, &[("M", "black", 0)]);
        assert!(!p.in_stock());
        assert!(p.colors_for_size("M").is_empty());
    }

    #[test]
    fn test_sale_price() {
        let mut p = product(1, 1, &[]);
        p.discount_percent = 20;
        assert!(p.on_sale());
        assert_eq!(p.sale_price(), Money::from_cents(4000));
    }

    #[test]
    fn test_rating_summary() {
        let summary = RatingSummary::from_reviews(&[review(5), review(4), review(4), review(0)]);
        assert_eq!(summary.count, 4);
        // 0 is clamped to 1: (5 + 4 + 4 + 1) / 4 = 3.5
        assert!((summary.average - 3.5).abs() < f32::EPSILON);
        assert_eq!(summary.histogram, [1, 2, 0, 0, 1]);
    }

    #[test]
    fn test_rating_summary_empty() {
        let summary = RatingSummary::from_reviews(&[]);
        assert_eq!(summary.count, 0);
        assert!(summary.average.abs() < f32::EPSILON);
    }

    #[test]
    fn test_query_normalization() {
        let query = ProductQuery {
            keyword: Some("   ".to_string()),
            min_price: Some(Money::from_cents(9000)),
            max_price: Some(Money::from_cents(1000)),
            page: Some(0),
            page_size: Some(500),
            ..ProductQuery::default()
        }
        .normalized();

        assert_eq!(query.keyword, None);
        assert_eq!(query.page, Some(1));
        assert_eq!(query.page_size, Some(MAX_PAGE_SIZE));
        assert_eq!(query.min_price, Some(Money::from_cents(1000)));
        assert_eq!(query.max_price, Some(Money::from_cents(9000)));
    }

    #[test]
    fn test_query_defaults_page_size() {
        let query = ProductQuery::default().normalized();
        assert_eq!(query.page_size, Some(DEFAULT_PAGE_SIZE));
        assert_eq!(query.with_page(3).page, Some(3));
    }

    #[test]
    fn test_page_navigation() {
        let page: Page<u8> = Page {
            items: vec![],
            page: 2,
            pages: 3,
            total: 30,
        };
        assert!(page.has_next());
        assert!(page.has_prev());
        assert!(!Page::<u8>::empty().has_next());
    }
}
