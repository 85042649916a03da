//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::state::AppState;
use crate::views::{Layout, ProductCard};

/// Products shown in the "Trending" row.
const TRENDING_LIMIT: usize = 8;

/// Category tile on the home page.
#[derive(Clone)]
pub struct CategoryTile {
    pub id: i32,
    pub name: String,
    pub product_count: u32,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub trending: Vec<ProductCard>,
    pub categories: Vec<CategoryTile>,
}

/// Display the home page: top-rated products and category tiles.
#[instrument(skip(state, session, user))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<HomeTemplate> {
    let (top, categories) = tokio::join!(state.api().top_products(), state.api().categories());

    let trending = top?
        .iter()
        .take(TRENDING_LIMIT)
        .map(ProductCard::from)
        .collect();
    let categories = categories?
        .into_iter()
        .map(|c| CategoryTile {
            id: c.id.as_i32(),
            name: c.name,
            product_count: c.product_count,
        })
        .collect();

    Ok(HomeTemplate {
        layout: Layout::load(&session, user.as_ref()).await,
        trending,
        categories,
    })
}
