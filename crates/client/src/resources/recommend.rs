//! Recommendation service and panel wiring.

use tracing::{instrument, warn};

use atelier_core::ProductId;
use atelier_core::catalog::Product;
use atelier_core::recommend::{
    Outfit, Recommendation, RecommendationModel, ScoredProduct, assemble_outfit, rank_similar,
};

use crate::cache::CacheKey;
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::ScoredList;

/// Candidates requested for "You might also like".
pub const SIMILAR_CANDIDATES: usize = 24;

/// Candidates requested for "Complete the look".
pub const OUTFIT_CANDIDATES: usize = 40;

impl ApiClient {
    /// Scored products similar to `id`.
    ///
    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self), fields(product_id = %id, model = model.as_str()))]
    pub async fn similar(
        &self,
        id: ProductId,
        model: RecommendationModel,
    ) -> Result<Vec<ScoredProduct>, ApiError> {
        let rec = self.recommender().clone();
        let key = CacheKey::Similar { product: id, model };
        self.cache()
            .get_or_fetch(key, async move {
                let list: ScoredList = rec
                    .get_with_query(
                        &format!("/recommend/{id}/similar"),
                        &[("model", model.as_str().to_string()), ("k", SIMILAR_CANDIDATES.to_string())],
                        None,
                    )
                    .await?;
                Ok(list.items)
            })
            .await
    }

    /// Scored complementary products for `id`.
    ///
    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self), fields(product_id = %id, model = model.as_str()))]
    pub async fn outfit_candidates(
        &self,
        id: ProductId,
        model: RecommendationModel,
    ) -> Result<Vec<ScoredProduct>, ApiError> {
        let rec = self.recommender().clone();
        let key = CacheKey::Outfit { product: id, model };
        self.cache()
            .get_or_fetch(key, async move {
                let list: ScoredList = rec
                    .get_with_query(
                        &format!("/recommend/{id}/outfit"),
                        &[("model", model.as_str().to_string()), ("k", OUTFIT_CANDIDATES.to_string())],
                        None,
                    )
                    .await?;
                Ok(list.items)
            })
            .await
    }

    /// The "You might also like" panel.
    ///
    /// A failing recommendation service yields an empty panel, not an error.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn you_might_also_like(
        &self,
        id: ProductId,
        model: RecommendationModel,
        limit: usize,
    ) -> Vec<Recommendation> {
        let scored = match self.similar(id, model).await {
            Ok(scored) => scored,
            Err(e) => {
                warn!(error = %e, "Similar products unavailable");
                return Vec::new();
            }
        };
        let products = self.hydrate(&scored).await;
        rank_similar(id, &scored, &products, limit)
    }

    /// The "Complete the look" panel.
    ///
    /// A failing recommendation service yields an empty outfit, not an error.
    #[instrument(skip(self, source), fields(product_id = %source.id))]
    pub async fn complete_the_look(&self, source: &Product, model: RecommendationModel) -> Outfit {
        let scored = match self.outfit_candidates(source.id, model).await {
            Ok(scored) => scored,
            Err(e) => {
                warn!(error = %e, "Outfit candidates unavailable");
                Vec::new()
            }
        };
        let products = self.hydrate(&scored).await;
        assemble_outfit(source, &scored, &products)
    }

    async fn hydrate(&self, scored: &[ScoredProduct]) -> Vec<Product> {
        let mut ids: Vec<ProductId> = scored.iter().map(|s| s.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        self.products_by_ids(&ids).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::products::tests::product_json_in;
    use crate::client::tests::client_for;
    use atelier_core::ProductId;
    use atelier_core::recommend::RecommendationModel;
    use mockito::{Matcher, Server};

    async fn mock_product(server: &mut Server, id: i32, category: i32, stock: u32) {
        server
            .mock("GET", format!("/products/{id}").as_str())
            .with_status(200)
            .with_body(product_json_in(id, category, stock))
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn test_you_might_also_like_ranks_hydrated_products() {
        let mut server = Server::new_async().await;
        let rec = server
            .mock("GET", "/recommend/1/similar")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("model".into(), "gnn".into()),
                Matcher::UrlEncoded("k".into(), "24".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"items":[
                    {"product_id":2,"score":0.5},
                    {"product_id":3,"score":0.9},
                    {"product_id":4,"score":0.7},
                    {"product_id":1,"score":1.0}
                ]}"#,
            )
            .create_async()
            .await;
        mock_product(&mut server, 2, 2, 3).await;
        mock_product(&mut server, 3, 2, 0).await;
        mock_product(&mut server, 4, 5, 1).await;
        server
            .mock("GET", "/products/1")
            .with_status(200)
            .with_body(product_json_in(1, 2, 1))
            .create_async()
            .await;

        let ranked = client_for(&server)
            .you_might_also_like(ProductId::new(1), RecommendationModel::Gnn, 8)
            .await;

        let ids: Vec<i32> = ranked.iter().map(|r| r.product.id.as_i32()).collect();
        assert_eq!(ids, vec![4, 2]);
        rec.assert_async().await;
    }

    #[tokio::test]
    async fn test_service_outage_gives_empty_panels() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/recommend/".to_string()))
            .with_status(503)
            .create_async()
            .await;

        let client = client_for(&server);
        let similar = client
            .you_might_also_like(ProductId::new(1), RecommendationModel::Hybrid, 8)
            .await;
        assert!(similar.is_empty());

        let source = serde_json::from_str(&product_json_in(1, 2, 1)).unwrap();
        let outfit = client
            .complete_the_look(&source, RecommendationModel::Hybrid)
            .await;
        assert!(outfit.is_empty());
    }

    #[tokio::test]
    async fn test_complete_the_look_one_per_category() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/recommend/1/outfit")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"items":[
                    {"product_id":2,"score":0.95},
                    {"product_id":3,"score":0.6},
                    {"product_id":4,"score":0.8},
                    {"product_id":5,"score":0.7}
                ]}"#,
            )
            .create_async()
            .await;
        mock_product(&mut server, 2, 2, 5).await; // same category as source
        mock_product(&mut server, 3, 3, 5).await;
        mock_product(&mut server, 4, 3, 5).await;
        mock_product(&mut server, 5, 4, 5).await;

        let source = serde_json::from_str(&product_json_in(1, 2, 1)).unwrap();
        let outfit = client_for(&server)
            .complete_the_look(&source, RecommendationModel::Cbf)
            .await;

        let picks: Vec<i32> = outfit.slots.iter().map(|s| s.product.id.as_i32()).collect();
        assert_eq!(picks, vec![4, 5]);
    }
}
