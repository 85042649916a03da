//! Brand and category management.
//!
//! Both taxonomies are flat name lists with the same screens, so they share
//! one template and one set of helpers keyed by [`Kind`].

use askama::Template;
use askama_web::WebTemplate;
use atelier_client::ApiError;
use atelier_core::catalog::{Brand, Category};
use atelier_core::{BrandId, CategoryId};
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::models::{CurrentAdmin, Flash};
use crate::routes::{flash_outcome, redirect_with_flash, upstream_failure};
use crate::state::AppState;
use crate::views::Shell;

const MAX_NAME_LEN: usize = 60;

/// Which taxonomy a screen manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Brands,
    Categories,
}

impl Kind {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Brands => "/brands",
            Self::Categories => "/categories",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Brands => "Brands",
            Self::Categories => "Categories",
        }
    }

    #[must_use]
    pub const fn singular(self) -> &'static str {
        match self {
            Self::Brands => "brand",
            Self::Categories => "category",
        }
    }
}

/// One brand or category row.
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: i32,
    pub name: String,
    pub product_count: u32,
}

impl From<&Brand> for Entry {
    fn from(brand: &Brand) -> Self {
        Self {
            id: brand.id.as_i32(),
            name: brand.name.clone(),
            product_count: brand.product_count,
        }
    }
}

impl From<&Category> for Entry {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id.as_i32(),
            name: category.name.clone(),
            product_count: category.product_count,
        }
    }
}

/// Brand/category list page template.
#[derive(Template, WebTemplate)]
#[template(path = "taxonomy.html")]
pub struct TaxonomyTemplate {
    pub shell: Shell,
    pub title: &'static str,
    pub singular: &'static str,
    pub base_path: &'static str,
    pub entries: Vec<Entry>,
}

/// Create/rename form.
#[derive(Debug, Deserialize)]
pub struct NameForm {
    #[serde(default)]
    pub name: String,
}

/// Trim a submitted name and check its length.
///
/// # Errors
///
/// Returns a message for blank or overlong names.
pub fn validate_name(raw: &str) -> std::result::Result<String, String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("Name cannot be blank.".to_string());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("Name must be at most {MAX_NAME_LEN} characters."));
    }
    Ok(name.to_string())
}

/// Sorted by name, case-insensitive.
fn sorted(mut entries: Vec<Entry>) -> Vec<Entry> {
    entries.sort_by_key(|e| e.name.to_lowercase());
    entries
}

async fn render(
    state: &AppState,
    session: &Session,
    admin: &CurrentAdmin,
    kind: Kind,
) -> Result<Response> {
    let entries: std::result::Result<Vec<Entry>, ApiError> = match kind {
        Kind::Brands => state
            .api()
            .brands()
            .await
            .map(|items| items.iter().map(Entry::from).collect()),
        Kind::Categories => state
            .api()
            .categories()
            .await
            .map(|items| items.iter().map(Entry::from).collect()),
    };
    let entries = match entries {
        Ok(entries) => sorted(entries),
        Err(e) => return upstream_failure(session, e).await,
    };

    let template = TaxonomyTemplate {
        shell: Shell::load(session, admin, kind.path()).await,
        title: kind.title(),
        singular: kind.singular(),
        base_path: kind.path(),
        entries,
    };
    Ok(template.into_response())
}

async fn create(
    state: &AppState,
    session: &Session,
    admin: &CurrentAdmin,
    kind: Kind,
    form: NameForm,
) -> Result<Response> {
    let name = match validate_name(&form.name) {
        Ok(name) => name,
        Err(message) => {
            return Ok(redirect_with_flash(session, Flash::error(message), kind.path()).await);
        }
    };

    let token = admin.token();
    let outcome: std::result::Result<(), ApiError> = match kind {
        Kind::Brands => state.api().create_brand(&name, &token).await.map(|_| ()),
        Kind::Categories => state.api().create_category(&name, &token).await.map(|_| ()),
    };
    let outcome = outcome.map(|()| {
        info!(kind = kind.singular(), %name, "Created");
        format!("Created {} \"{name}\".", kind.singular())
    });
    flash_outcome(session, outcome, kind.path()).await
}

async fn rename(
    state: &AppState,
    session: &Session,
    admin: &CurrentAdmin,
    kind: Kind,
    id: i32,
    form: NameForm,
) -> Result<Response> {
    let name = match validate_name(&form.name) {
        Ok(name) => name,
        Err(message) => {
            return Ok(redirect_with_flash(session, Flash::error(message), kind.path()).await);
        }
    };

    let token = admin.token();
    let outcome: std::result::Result<(), ApiError> = match kind {
        Kind::Brands => state
            .api()
            .rename_brand(BrandId::new(id), &name, &token)
            .await
            .map(|_| ()),
        Kind::Categories => state
            .api()
            .rename_category(CategoryId::new(id), &name, &token)
            .await
            .map(|_| ()),
    };
    let outcome = outcome.map(|()| {
        info!(kind = kind.singular(), id, %name, "Renamed");
        format!("Renamed {} to \"{name}\".", kind.singular())
    });
    flash_outcome(session, outcome, kind.path()).await
}

async fn delete(
    state: &AppState,
    session: &Session,
    admin: &CurrentAdmin,
    kind: Kind,
    id: i32,
) -> Result<Response> {
    let token = admin.token();
    let outcome = match kind {
        Kind::Brands => state.api().delete_brand(BrandId::new(id), &token).await,
        Kind::Categories => {
            state
                .api()
                .delete_category(CategoryId::new(id), &token)
                .await
        }
    };
    let outcome = outcome.map(|()| {
        info!(kind = kind.singular(), id, "Deleted");
        format!("Deleted {} #{id}.", kind.singular())
    });
    flash_outcome(session, outcome, kind.path()).await
}

/// Brand list.
#[instrument(skip(admin, state, session))]
pub async fn brands(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Response> {
    render(&state, &session, &admin, Kind::Brands).await
}

/// Create a brand.
#[instrument(skip(admin, state, session, form))]
pub async fn create_brand(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<NameForm>,
) -> Result<Response> {
    create(&state, &session, &admin, Kind::Brands, form).await
}

/// Rename a brand.
#[instrument(skip(admin, state, session, form))]
pub async fn rename_brand(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<NameForm>,
) -> Result<Response> {
    rename(&state, &session, &admin, Kind::Brands, id, form).await
}

/// Delete a brand. The backend refuses brands that still have products.
#[instrument(skip(admin, state, session))]
pub async fn delete_brand(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Response> {
    delete(&state, &session, &admin, Kind::Brands, id).await
}

/// Category list.
#[instrument(skip(admin, state, session))]
pub async fn categories(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Response> {
    render(&state, &session, &admin, Kind::Categories).await
}

/// Create a category.
#[instrument(skip(admin, state, session, form))]
pub async fn create_category(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<NameForm>,
) -> Result<Response> {
    create(&state, &session, &admin, Kind::Categories, form).await
}

/// Rename a category.
#[instrument(skip(admin, state, session, form))]
pub async fn rename_category(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<NameForm>,
) -> Result<Response> {
    rename(&state, &session, &admin, Kind::Categories, id, form).await
}

/// Delete a category.
#[instrument(skip(admin, state, session))]
pub async fn delete_category(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Response> {
    delete(&state, &session, &admin, Kind::Categories, id).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Nordic  ").unwrap(), "Nordic");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_entries_sort_case_insensitively() {
        let entries = sorted(vec![
            Entry { id: 1, name: "zara".to_string(), product_count: 0 },
            Entry { id: 2, name: "Acne".to_string(), product_count: 3 },
            Entry { id: 3, name: "b&b".to_string(), product_count: 1 },
        ]);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Acne", "b&b", "zara"]);
    }

    #[test]
    fn test_kind_paths() {
        assert_eq!(Kind::Brands.path(), "/brands");
        assert_eq!(Kind::Categories.singular(), "category");
    }
}
