//! Recommendation panel fragments, loaded by HTMX from the product page.

use askama::Template;
use askama_web::WebTemplate;
use atelier_core::ProductId;
use atelier_core::recommend::RecommendationModel;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::state::AppState;
use crate::views::{ProductCard, SelectOption};

/// Products shown in "You might also like".
const SIMILAR_LIMIT: usize = 8;

/// Model selector query.
#[derive(Debug, Deserialize)]
pub struct ModelQuery {
    pub model: Option<String>,
}

fn model_options(selected: RecommendationModel) -> Vec<SelectOption> {
    [
        (RecommendationModel::Hybrid, "Best match"),
        (RecommendationModel::Gnn, "Shoppers also viewed"),
        (RecommendationModel::Cbf, "Similar style"),
    ]
    .into_iter()
    .map(|(model, label)| SelectOption::new(model.as_str(), label, model == selected))
    .collect()
}

/// "You might also like" fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/similar.html")]
pub struct SimilarTemplate {
    pub product_id: i32,
    pub models: Vec<SelectOption>,
    pub products: Vec<ProductCard>,
}

/// One category slot in "Complete the look".
#[derive(Clone)]
pub struct OutfitSlotView {
    pub category: String,
    pub product: ProductCard,
}

/// "Complete the look" fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/outfit.html")]
pub struct OutfitTemplate {
    pub product_id: i32,
    pub models: Vec<SelectOption>,
    pub slots: Vec<OutfitSlotView>,
    pub bundle_price: String,
}

/// Render the similar-products panel. An unavailable service yields an
/// empty panel.
#[instrument(skip(state))]
pub async fn similar(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<ModelQuery>,
) -> SimilarTemplate {
    let model = RecommendationModel::from_param(query.model.as_deref());
    let recommendations = state
        .api()
        .you_might_also_like(ProductId::new(id), model, SIMILAR_LIMIT)
        .await;

    SimilarTemplate {
        product_id: id,
        models: model_options(model),
        products: recommendations.iter().map(ProductCard::from).collect(),
    }
}

/// Render the outfit panel: one complementary product per category.
#[instrument(skip(state))]
pub async fn outfit(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<ModelQuery>,
) -> Result<OutfitTemplate> {
    let model = RecommendationModel::from_param(query.model.as_deref());
    let source = state.api().product(ProductId::new(id)).await?;
    let outfit = state.api().complete_the_look(&source, model).await;

    Ok(OutfitTemplate {
        product_id: id,
        models: model_options(model),
        bundle_price: outfit.bundle_price.to_string(),
        slots: outfit
            .slots
            .iter()
            .map(|slot| OutfitSlotView {
                category: slot.category_name.clone(),
                product: ProductCard::from(&slot.product),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_options_mark_selection() {
        let options = model_options(RecommendationModel::Cbf);
        let selected: Vec<&str> = options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value.as_str())
            .collect();
        assert_eq!(selected, vec!["cbf"]);
    }
}
