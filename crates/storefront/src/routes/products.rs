//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use atelier_core::catalog::{Product, ProductQuery, RatingSummary, Review, SortOrder};
use atelier_core::{BrandId, CategoryId, Money, ProductId};
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::state::AppState;
use crate::views::{Layout, PLACEHOLDER_IMAGE, ProductCard, SelectOption};

// =============================================================================
// Listing
// =============================================================================

/// Listing filters as submitted by the filter form.
///
/// Every field is a raw string so blank form fields don't reject the request;
/// unparseable values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ListingParams {
    pub keyword: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
}

fn parse_opt<T: std::str::FromStr>(raw: Option<&String>) -> Option<T> {
    raw.map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
}

impl ListingParams {
    /// Normalized backend query.
    #[must_use]
    pub fn to_query(&self) -> ProductQuery {
        let sort = self
            .sort
            .as_deref()
            .and_then(|s| {
                SortOrder::OPTIONS
                    .iter()
                    .find(|(order, _)| order.as_str() == s)
            })
            .map(|(order, _)| *order)
            .unwrap_or_default();

        ProductQuery {
            keyword: self.keyword.clone(),
            brand: parse_opt::<BrandId>(self.brand.as_ref()),
            category: parse_opt::<CategoryId>(self.category.as_ref()),
            min_price: parse_opt::<Money>(self.min_price.as_ref()),
            max_price: parse_opt::<Money>(self.max_price.as_ref()),
            sort,
            page: parse_opt::<u32>(self.page.as_ref()),
            page_size: None,
        }
        .normalized()
    }
}

/// Build the listing URL for `query` on `page`.
#[must_use]
pub fn listing_href(query: &ProductQuery, page: u32) -> String {
    let mut params: Vec<String> = Vec::new();
    if let Some(keyword) = &query.keyword {
        params.push(format!("keyword={}", urlencoding::encode(keyword)));
    }
    if let Some(brand) = query.brand {
        params.push(format!("brand={brand}"));
    }
    if let Some(category) = query.category {
        params.push(format!("category={category}"));
    }
    if let Some(min) = query.min_price {
        params.push(format!("min_price={}", min.amount()));
    }
    if let Some(max) = query.max_price {
        params.push(format!("max_price={}", max.amount()));
    }
    if query.sort != SortOrder::default() {
        params.push(format!("sort={}", query.sort.as_str()));
    }
    if page > 1 {
        params.push(format!("page={page}"));
    }

    if params.is_empty() {
        "/products".to_string()
    } else {
        format!("/products?{}", params.join("&"))
    }
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: Layout,
    pub products: Vec<ProductCard>,
    pub keyword: String,
    pub min_price: String,
    pub max_price: String,
    pub brands: Vec<SelectOption>,
    pub categories: Vec<SelectOption>,
    pub sorts: Vec<SelectOption>,
    pub total: u64,
    pub current_page: u32,
    pub total_pages: u32,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

/// Display product listing page.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(params): Query<ListingParams>,
) -> Result<ProductsIndexTemplate> {
    let query = params.to_query();
    let (page, brands, categories) = tokio::join!(
        state.api().products(&query),
        state.api().brands(),
        state.api().categories()
    );
    let page = page?;

    let brands = brands
        .unwrap_or_else(|e| {
            warn!(error = %e, "Brand facet unavailable");
            Vec::new()
        })
        .into_iter()
        .map(|b| SelectOption::new(b.id.to_string(), b.name, query.brand == Some(b.id)))
        .collect();
    let categories = categories
        .unwrap_or_else(|e| {
            warn!(error = %e, "Category facet unavailable");
            Vec::new()
        })
        .into_iter()
        .map(|c| SelectOption::new(c.id.to_string(), c.name, query.category == Some(c.id)))
        .collect();
    let sorts = SortOrder::OPTIONS
        .iter()
        .map(|(order, label)| SelectOption::new(order.as_str(), *label, *order == query.sort))
        .collect();

    Ok(ProductsIndexTemplate {
        layout: Layout::load(&session, user.as_ref()).await,
        products: page.items.iter().map(ProductCard::from).collect(),
        keyword: query.keyword.clone().unwrap_or_default(),
        min_price: query.min_price.map(|m| m.amount().to_string()).unwrap_or_default(),
        max_price: query.max_price.map(|m| m.amount().to_string()).unwrap_or_default(),
        brands,
        categories,
        sorts,
        total: page.total,
        current_page: page.page,
        total_pages: page.pages,
        prev_href: page
            .has_prev()
            .then(|| listing_href(&query, page.page.saturating_sub(1))),
        next_href: page.has_next().then(|| listing_href(&query, page.page + 1)),
    })
}

// =============================================================================
// Detail
// =============================================================================

/// One size/color combination on the detail page.
#[derive(Clone)]
pub struct VariantView {
    pub size: String,
    pub color: String,
    pub stock: u32,
    pub available: bool,
    pub low_stock: bool,
}

/// A review on the detail page.
#[derive(Clone)]
pub struct ReviewView {
    pub author: String,
    pub rating: u8,
    pub comment: String,
    pub date: String,
}

impl From<&Review> for ReviewView {
    fn from(review: &Review) -> Self {
        Self {
            author: review.author.clone(),
            rating: review.rating,
            comment: review.comment.clone(),
            date: review.created_at.format("%b %-d, %Y").to_string(),
        }
    }
}

/// One bar in the rating histogram.
#[derive(Clone)]
pub struct HistogramRow {
    pub stars: u8,
    pub count: usize,
    pub percent: usize,
}

/// A size in the add-to-cart picker.
#[derive(Clone)]
pub struct SizeOption {
    pub value: String,
    /// At least one color can be bought in this size.
    pub available: bool,
}

/// Product detail display data.
#[derive(Clone)]
pub struct ProductDetailView {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub brand_id: i32,
    pub category: String,
    pub category_id: i32,
    pub images: Vec<String>,
    pub price: String,
    pub original_price: Option<String>,
    pub discount_percent: u8,
    pub in_stock: bool,
    pub sizes: Vec<SizeOption>,
    /// First buyable size, preselected in the picker.
    pub selected_size: String,
    /// Buyable colors for `selected_size`.
    pub colors: Vec<String>,
    /// Every color the product comes in, for display.
    pub color_names: String,
    pub variants: Vec<VariantView>,
}

/// Threshold under which a variant shows "only N left".
const LOW_STOCK: u32 = 3;

impl From<&Product> for ProductDetailView {
    fn from(product: &Product) -> Self {
        let images = if product.images.is_empty() {
            vec![PLACEHOLDER_IMAGE.to_string()]
        } else {
            product.images.clone()
        };

        let sizes: Vec<SizeOption> = product
            .sizes()
            .into_iter()
            .map(|size| SizeOption {
                value: size.to_string(),
                available: !product.colors_for_size(size).is_empty(),
            })
            .collect();
        let selected_size = sizes
            .iter()
            .find(|s| s.available)
            .map(|s| s.value.clone())
            .unwrap_or_default();
        let colors = product
            .colors_for_size(&selected_size)
            .into_iter()
            .map(str::to_string)
            .collect();

        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            description: product.description.clone(),
            brand: product.brand.name.clone(),
            brand_id: product.brand.id.as_i32(),
            category: product.category.name.clone(),
            category_id: product.category.id.as_i32(),
            images,
            price: product.sale_price().to_string(),
            original_price: product.on_sale().then(|| product.price.to_string()),
            discount_percent: product.discount_percent,
            in_stock: product.in_stock(),
            sizes,
            selected_size,
            colors,
            color_names: product.colors().join(", "),
            variants: product
                .variants
                .iter()
                .map(|v| VariantView {
                    size: v.size.clone(),
                    color: v.color.clone(),
                    stock: v.stock,
                    available: v.stock > 0,
                    low_stock: v.stock > 0 && v.stock <= LOW_STOCK,
                })
                .collect(),
        }
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: ProductDetailView,
    pub rating_average: String,
    pub rating_count: usize,
    pub histogram: Vec<HistogramRow>,
    pub reviews: Vec<ReviewView>,
    pub signed_in: bool,
    pub has_reviewed: bool,
    pub is_favorite: bool,
}

fn histogram_rows(summary: &RatingSummary) -> Vec<HistogramRow> {
    summary
        .histogram
        .iter()
        .zip((1..=5u8).rev())
        .map(|(&count, stars)| HistogramRow {
            stars,
            count,
            percent: (count * 100).checked_div(summary.count).unwrap_or(0),
        })
        .collect()
}

/// Whether `user` has `product` among their favorites. Failures read as "no".
async fn is_favorite(state: &AppState, user: &CurrentUser, product: ProductId) -> bool {
    match state.api().favorites(user.id, &user.token()).await {
        Ok(favorites) => favorites.iter().any(|p| p.id == product),
        Err(e) => {
            warn!(error = %e, "Favorites unavailable");
            false
        }
    }
}

/// Display product detail page.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<i32>,
) -> Result<ProductShowTemplate> {
    let id = ProductId::new(id);
    let (product, reviews) = tokio::join!(state.api().product(id), state.api().reviews(id));
    let product = product?;
    let reviews = reviews.unwrap_or_else(|e| {
        warn!(error = %e, "Reviews unavailable");
        Vec::new()
    });

    let summary = RatingSummary::from_reviews(&reviews);
    let (is_favorite, has_reviewed) = match &user {
        Some(user) => (
            is_favorite(&state, user, id).await,
            reviews.iter().any(|r| r.user_id == user.id),
        ),
        None => (false, false),
    };

    crate::error::add_breadcrumb(
        "navigation",
        "Viewed product",
        Some(&[("product_id", &id.to_string())]),
    );

    Ok(ProductShowTemplate {
        layout: Layout::load(&session, user.as_ref()).await,
        product: ProductDetailView::from(&product),
        rating_average: format!("{:.1}", summary.average),
        rating_count: summary.count,
        histogram: histogram_rows(&summary),
        reviews: reviews.iter().map(ReviewView::from).collect(),
        signed_in: user.is_some(),
        has_reviewed,
        is_favorite,
    })
}

/// Size chosen in the add-to-cart picker.
#[derive(Debug, Deserialize)]
pub struct ColorParams {
    #[serde(default)]
    pub size: String,
}

/// Color picker fragment for one size (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/color_select.html")]
pub struct ColorSelectTemplate {
    pub colors: Vec<String>,
}

/// Refill the color picker with the colors in stock for a size.
#[instrument(skip(state))]
pub async fn colors(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(params): Query<ColorParams>,
) -> Result<ColorSelectTemplate> {
    let product = state.api().product(ProductId::new(id)).await?;
    Ok(ColorSelectTemplate {
        colors: product
            .colors_for_size(&params.size)
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ListingParams {
        let mut params = ListingParams::default();
        for (key, value) in pairs {
            let value = Some((*value).to_string());
            match *key {
                "keyword" => params.keyword = value,
                "brand" => params.brand = value,
                "category" => params.category = value,
                "min_price" => params.min_price = value,
                "max_price" => params.max_price = value,
                "sort" => params.sort = value,
                "page" => params.page = value,
                _ => unreachable!(),
            }
        }
        params
    }

    #[test]
    fn test_blank_fields_are_ignored() {
        let query = params(&[("brand", ""), ("min_price", " "), ("keyword", "  ")]).to_query();
        assert_eq!(query.brand, None);
        assert_eq!(query.min_price, None);
        assert_eq!(query.keyword, None);
        assert_eq!(query.page, Some(1));
    }

    #[test]
    fn test_params_parse_into_query() {
        let query = params(&[
            ("keyword", "linen"),
            ("category", "4"),
            ("min_price", "80"),
            ("max_price", "20"),
            ("sort", "price_desc"),
            ("page", "3"),
        ])
        .to_query();

        assert_eq!(query.category, Some(CategoryId::new(4)));
        assert_eq!(query.sort, SortOrder::PriceDesc);
        assert_eq!(query.page, Some(3));
        // Inverted range is swapped by normalization
        assert_eq!(query.min_price, Some(Money::from_cents(2_000)));
        assert_eq!(query.max_price, Some(Money::from_cents(8_000)));
    }

    #[test]
    fn test_unknown_sort_falls_back_to_default() {
        let query = params(&[("sort", "cheapest"), ("page", "zero")]).to_query();
        assert_eq!(query.sort, SortOrder::Newest);
        assert_eq!(query.page, Some(1));
    }

    #[test]
    fn test_listing_href_keeps_filters() {
        let query = params(&[("keyword", "wool coat"), ("brand", "2"), ("sort", "rating")])
            .to_query();
        assert_eq!(
            listing_href(&query, 2),
            "/products?keyword=wool%20coat&brand=2&sort=rating&page=2"
        );
        assert_eq!(listing_href(&ProductQuery::default(), 1), "/products");
    }

    #[test]
    fn test_histogram_percentages() {
        let summary = RatingSummary {
            count: 4,
            average: 4.25,
            histogram: [2, 1, 1, 0, 0],
        };
        let rows = histogram_rows(&summary);
        assert_eq!(rows[0].stars, 5);
        assert_eq!(rows[0].percent, 50);
        assert_eq!(rows[4].count, 0);
    }

    fn shirt(variants: serde_json::Value) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": 7,
            "name": "Linen Shirt",
            "description": "Breathable",
            "brand": {"id": 1, "name": "Maison"},
            "category": {"id": 2, "name": "Shirts"},
            "price": "49.90",
            "discount_percent": 0,
            "images": [],
            "variants": variants,
            "rating": 4.5,
            "review_count": 2,
            "created_at": "2026-01-05T10:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_picker_offers_only_buyable_pairs() {
        let view = ProductDetailView::from(&shirt(serde_json::json!([
            {"size": "S", "color": "white", "stock": 0},
            {"size": "M", "color": "white", "stock": 0},
            {"size": "M", "color": "navy", "stock": 4},
            {"size": "L", "color": "white", "stock": 2}
        ])));

        let sizes: Vec<(&str, bool)> = view
            .sizes
            .iter()
            .map(|s| (s.value.as_str(), s.available))
            .collect();
        assert_eq!(sizes, vec![("S", false), ("M", true), ("L", true)]);
        // S is sold out, so M is preselected and white is not offered with it
        assert_eq!(view.selected_size, "M");
        assert_eq!(view.colors, vec!["navy".to_string()]);
        assert_eq!(view.color_names, "white, navy");
    }

    #[test]
    fn test_sold_out_product_has_no_picker_choice() {
        let view = ProductDetailView::from(&shirt(serde_json::json!([
            {"size": "M", "color": "white", "stock": 0}
        ])));
        assert!(!view.in_stock);
        assert_eq!(view.selected_size, "");
        assert!(view.colors.is_empty());
    }

    #[test]
    fn test_color_fragment_omits_sold_out_colors() {
        let product = shirt(serde_json::json!([
            {"size": "M", "color": "white", "stock": 0},
            {"size": "M", "color": "navy", "stock": 1}
        ]));
        let html = ColorSelectTemplate {
            colors: product
                .colors_for_size("M")
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
        .render()
        .unwrap();
        assert!(html.contains(r#"value="navy""#));
        assert!(!html.contains("white"));
    }
}
