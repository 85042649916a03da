//! Product management.

use std::collections::HashSet;

use askama::Template;
use askama_web::WebTemplate;
use atelier_client::{ApiError, ProductInput};
use atelier_core::catalog::{Brand, Category, Product, ProductQuery, Variant};
use atelier_core::{BrandId, CategoryId, Money, ProductId};
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::models::{CurrentAdmin, Flash};
use crate::routes::{flash_outcome, is_rejection, redirect_with_flash, upstream_failure};
use crate::state::AppState;
use crate::views::{SelectOption, Shell};

/// Products per admin listing page.
const PAGE_SIZE: u32 = 25;

/// Total stock at or below which a product is flagged.
const LOW_STOCK: u32 = 5;

const MAX_NAME_LEN: usize = 120;

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
}

/// Product row for the listing table.
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub id: i32,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub price: String,
    pub discount_percent: u8,
    pub variants: usize,
    pub stock: u32,
    pub low_stock: bool,
}

impl From<&Product> for ProductRow {
    fn from(product: &Product) -> Self {
        let stock = product.total_stock();
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            brand: product.brand.name.clone(),
            category: product.category.name.clone(),
            price: product.price.to_string(),
            discount_percent: product.discount_percent,
            variants: product.variants.len(),
            stock,
            low_stock: stock <= LOW_STOCK,
        }
    }
}

/// Products list page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub shell: Shell,
    pub products: Vec<ProductRow>,
    pub search_query: String,
    pub total: u64,
    pub page: u32,
    pub pages: u32,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

/// Product create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub shell: Shell,
    pub title: String,
    pub action: String,
    pub product_id: Option<i32>,
    pub form: ProductForm,
    pub brands: Vec<SelectOption>,
    pub categories: Vec<SelectOption>,
    pub errors: Vec<String>,
}

/// Product form data, kept as raw text so it can be re-rendered on error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand_id: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub discount_percent: String,
    /// One image URL per line.
    #[serde(default)]
    pub images: String,
    /// One `size:color:stock` entry per line.
    #[serde(default)]
    pub variants: String,
}

impl From<&Product> for ProductForm {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            brand_id: product.brand.id.to_string(),
            category_id: product.category.id.to_string(),
            price: product.price.amount().to_string(),
            discount_percent: product.discount_percent.to_string(),
            images: product.images.join("\n"),
            variants: product
                .variants
                .iter()
                .map(|v| format!("{}:{}:{}", v.size, v.color, v.stock))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl ProductForm {
    /// Check every field, collecting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns one message per invalid field.
    pub fn validated(&self) -> std::result::Result<ProductInput, Vec<String>> {
        let mut errors = Vec::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.push("Name is required.".to_string());
        } else if name.chars().count() > MAX_NAME_LEN {
            errors.push(format!("Name must be at most {MAX_NAME_LEN} characters."));
        }

        let brand_id = self.brand_id.trim().parse::<i32>().ok().map(BrandId::new);
        if brand_id.is_none() {
            errors.push("Choose a brand.".to_string());
        }
        let category_id = self.category_id.trim().parse::<i32>().ok().map(CategoryId::new);
        if category_id.is_none() {
            errors.push("Choose a category.".to_string());
        }

        let price = match self.price.parse::<Money>() {
            Ok(price) if price >= Money::ZERO => Some(price),
            Ok(_) => {
                errors.push("Price cannot be negative.".to_string());
                None
            }
            Err(_) => {
                errors.push("Price must be a number, like 49.90.".to_string());
                None
            }
        };

        let discount_text = self.discount_percent.trim();
        let discount = if discount_text.is_empty() {
            Some(0)
        } else {
            match discount_text.parse::<u8>() {
                Ok(d) if d <= 100 => Some(d),
                _ => {
                    errors.push("Discount must be a whole number from 0 to 100.".to_string());
                    None
                }
            }
        };

        let variants = match parse_variants(&self.variants) {
            Ok(variants) => Some(variants),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        match (brand_id, category_id, price, discount, variants) {
            (Some(brand_id), Some(category_id), Some(price), Some(discount_percent), Some(variants))
                if errors.is_empty() =>
            {
                Ok(ProductInput {
                    name: name.to_string(),
                    description: self.description.trim().to_string(),
                    brand_id,
                    category_id,
                    price,
                    discount_percent,
                    images: self
                        .images
                        .lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(String::from)
                        .collect(),
                    variants,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Parse the variants textarea: one `size:color:stock` per line.
///
/// Blank lines are skipped. At least one variant is required and each
/// size/color pair may appear only once.
///
/// # Errors
///
/// Returns a message naming the first bad line.
pub fn parse_variants(text: &str) -> std::result::Result<Vec<Variant>, String> {
    let mut variants = Vec::new();
    let mut seen = HashSet::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let number = index + 1;

        let parts: Vec<&str> = line.split(':').map(str::trim).collect();
        let [size, color, stock] = parts.as_slice() else {
            return Err(format!(
                "Variant line {number}: expected size:color:stock, got \"{line}\"."
            ));
        };
        if size.is_empty() || color.is_empty() {
            return Err(format!("Variant line {number}: size and color are required."));
        }
        let stock = stock
            .parse::<u32>()
            .map_err(|_| format!("Variant line {number}: stock must be a whole number."))?;
        if !seen.insert((size.to_lowercase(), color.to_lowercase())) {
            return Err(format!("Variant line {number}: {size}/{color} is listed twice."));
        }

        variants.push(Variant {
            size: (*size).to_string(),
            color: (*color).to_string(),
            stock,
        });
    }

    if variants.is_empty() {
        return Err("Add at least one variant.".to_string());
    }
    Ok(variants)
}

fn listing_href(q: &str, page: u32) -> String {
    if q.is_empty() {
        format!("/products?page={page}")
    } else {
        format!("/products?q={}&page={page}", urlencoding::encode(q))
    }
}

fn brand_options(brands: &[Brand], selected: &str) -> Vec<SelectOption> {
    brands
        .iter()
        .map(|b| {
            let id = b.id.to_string();
            let is_selected = id == selected;
            SelectOption::new(id, b.name.clone(), is_selected)
        })
        .collect()
}

fn category_options(categories: &[Category], selected: &str) -> Vec<SelectOption> {
    categories
        .iter()
        .map(|c| {
            let id = c.id.to_string();
            let is_selected = id == selected;
            SelectOption::new(id, c.name.clone(), is_selected)
        })
        .collect()
}

/// Render the product form with the brand and category pickers.
async fn render_form(
    state: &AppState,
    session: &Session,
    admin: &CurrentAdmin,
    product_id: Option<ProductId>,
    form: ProductForm,
    errors: Vec<String>,
) -> Result<Response> {
    let (brands, categories) = tokio::join!(state.api().brands(), state.api().categories());
    let (brands, categories) = (brands?, categories?);

    let (title, action) = match product_id {
        Some(id) => (format!("Edit {}", form.name), format!("/products/{id}")),
        None => ("New product".to_string(), "/products".to_string()),
    };
    let status = if errors.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };

    let template = ProductFormTemplate {
        shell: Shell::load(session, admin, "/products").await,
        title,
        action,
        product_id: product_id.as_ref().map(ProductId::as_i32),
        brands: brand_options(&brands, &form.brand_id),
        categories: category_options(&categories, &form.category_id),
        form,
        errors,
    };
    Ok((status, template).into_response())
}

/// Products list page handler.
#[instrument(skip(admin, state, session))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ProductsQuery>,
) -> Result<Response> {
    let search_query = query.q.unwrap_or_default().trim().to_string();
    let product_query = ProductQuery {
        keyword: Some(search_query.clone()),
        page: query.page,
        page_size: Some(PAGE_SIZE),
        ..ProductQuery::default()
    }
    .normalized();

    let page = match state.api().products(&product_query).await {
        Ok(page) => page,
        Err(e) => return upstream_failure(&session, e).await,
    };

    let template = ProductsIndexTemplate {
        shell: Shell::load(&session, &admin, "/products").await,
        products: page.items.iter().map(ProductRow::from).collect(),
        total: page.total,
        page: page.page,
        pages: page.pages,
        prev_href: page
            .has_prev()
            .then(|| listing_href(&search_query, page.page - 1)),
        next_href: page
            .has_next()
            .then(|| listing_href(&search_query, page.page + 1)),
        search_query,
    };
    Ok(template.into_response())
}

/// New product form.
#[instrument(skip(admin, state, session))]
pub async fn new(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Response> {
    let form = ProductForm {
        discount_percent: "0".to_string(),
        ..ProductForm::default()
    };
    render_form(&state, &session, &admin, None, form, Vec::new()).await
}

/// Create a product.
#[instrument(skip(admin, state, session, form), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let input = match form.validated() {
        Ok(input) => input,
        Err(errors) => return render_form(&state, &session, &admin, None, form, errors).await,
    };

    match state.api().create_product(&input, &admin.token()).await {
        Ok(product) => {
            info!(product_id = %product.id, "Product created");
            Ok(redirect_with_flash(
                &session,
                Flash::success(format!("Created {}.", product.name)),
                "/products",
            )
            .await)
        }
        Err(e) if is_rejection(&e) => {
            render_form(&state, &session, &admin, None, form, vec![e.user_message()]).await
        }
        Err(e) => upstream_failure(&session, e).await,
    }
}

/// Edit product form.
#[instrument(skip(admin, state, session))]
pub async fn edit(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Response> {
    let id = ProductId::new(id);
    let product = state.api().product(id).await?;
    render_form(
        &state,
        &session,
        &admin,
        Some(id),
        ProductForm::from(&product),
        Vec::new(),
    )
    .await
}

/// Update a product.
#[instrument(skip(admin, state, session, form), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let id = ProductId::new(id);
    let input = match form.validated() {
        Ok(input) => input,
        Err(errors) => return render_form(&state, &session, &admin, Some(id), form, errors).await,
    };

    match state.api().update_product(id, &input, &admin.token()).await {
        Ok(product) => {
            info!(product_id = %id, "Product updated");
            Ok(redirect_with_flash(
                &session,
                Flash::success(format!("Saved {}.", product.name)),
                "/products",
            )
            .await)
        }
        Err(e) if is_rejection(&e) => {
            render_form(&state, &session, &admin, Some(id), form, vec![e.user_message()]).await
        }
        Err(e) => upstream_failure(&session, e).await,
    }
}

/// Delete a product.
#[instrument(skip(admin, state, session), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Response> {
    let id = ProductId::new(id);
    let outcome: std::result::Result<String, ApiError> = state
        .api()
        .delete_product(id, &admin.token())
        .await
        .map(|()| {
            info!(product_id = %id, "Product deleted");
            format!("Deleted product #{id}.")
        });
    flash_outcome(&session, outcome, "/products").await
}
