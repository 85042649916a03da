//! Products and reviews.

use futures::future::join_all;
use tracing::{instrument, warn};

use atelier_core::ProductId;
use atelier_core::catalog::{Page, Product, ProductQuery, Review};

use crate::cache::{CacheKey, Invalidation};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{ProductInput, ReviewInput};
use crate::transport::AccessToken;

impl ApiClient {
    /// One page of the product listing.
    ///
    /// The query is normalized first so equivalent filters share a cache entry.
    ///
    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<Page<Product>, ApiError> {
        let query = query.clone().normalized();
        let api = self.api().clone();
        let key = CacheKey::Products(query.clone());
        self.cache()
            .get_or_fetch(key, async move {
                api.get_with_query("/products", &query, None).await
            })
            .await
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown IDs.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        let api = self.api().clone();
        self.cache()
            .get_or_fetch(CacheKey::Product(id), async move {
                api.get(&format!("/products/{id}"), None).await
            })
            .await
    }

    /// Best-rated products for the home page.
    ///
    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self))]
    pub async fn top_products(&self) -> Result<Vec<Product>, ApiError> {
        let api = self.api().clone();
        self.cache()
            .get_or_fetch(CacheKey::TopProducts, async move {
                api.get("/products/top", None).await
            })
            .await
    }

    /// Fetch several products concurrently, in the order given.
    ///
    /// IDs that fail to load are skipped; a recommendation pointing at a
    /// deleted product should not break the page.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn products_by_ids(&self, ids: &[ProductId]) -> Vec<Product> {
        let results = join_all(ids.iter().map(|id| self.product(*id))).await;
        ids.iter()
            .zip(results)
            .filter_map(|(id, result)| match result {
                Ok(product) => Some(product),
                Err(e) => {
                    if !e.is_not_found() {
                        warn!(product_id = %id, error = %e, "Failed to load product");
                    }
                    None
                }
            })
            .collect()
    }

    /// Create a product (admin).
    ///
    /// # Errors
    ///
    /// Returns the upstream error, e.g. validation failures as `Status { 400 }`.
    #[instrument(skip(self, input, token), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        input: &ProductInput,
        token: &AccessToken,
    ) -> Result<Product, ApiError> {
        let product: Product = self.api().post("/products", input, Some(token)).await?;
        self.invalidate(Invalidation::Product(product.id));
        Ok(product)
    }

    /// Replace a product (admin).
    ///
    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self, input, token), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
        token: &AccessToken,
    ) -> Result<Product, ApiError> {
        let product = self
            .api()
            .put(&format!("/products/{id}"), input, Some(token))
            .await?;
        self.invalidate(Invalidation::Product(id));
        Ok(product)
    }

    /// Delete a product (admin).
    ///
    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn delete_product(&self, id: ProductId, token: &AccessToken) -> Result<(), ApiError> {
        self.api()
            .delete(&format!("/products/{id}"), Some(token))
            .await?;
        self.invalidate(Invalidation::Product(id));
        Ok(())
    }

    /// Reviews for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn reviews(&self, id: ProductId) -> Result<Vec<Review>, ApiError> {
        let api = self.api().clone();
        self.cache()
            .get_or_fetch(CacheKey::Reviews(id), async move {
                api.get(&format!("/products/{id}/reviews"), None).await
            })
            .await
    }

    /// Post a review.
    ///
    /// # Errors
    ///
    /// Returns the upstream error (the backend rejects a second review by the
    /// same account with a 400 and a message).
    #[instrument(skip(self, review, token), fields(product_id = %id, rating = review.rating))]
    pub async fn create_review(
        &self,
        id: ProductId,
        review: &ReviewInput,
        token: &AccessToken,
    ) -> Result<Review, ApiError> {
        let created = self
            .api()
            .post(&format!("/products/{id}/reviews"), review, Some(token))
            .await?;
        self.invalidate(Invalidation::Review(id));
        Ok(created)
    }
}
