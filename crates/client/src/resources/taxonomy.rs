//! Brands and categories.

use tracing::instrument;

use atelier_core::catalog::{Brand, Category};
use atelier_core::{BrandId, CategoryId};

use crate::cache::{CacheKey, Invalidation};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::NameInput;
use crate::transport::AccessToken;

impl ApiClient {
    /// Every brand.
    ///
    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self))]
    pub async fn brands(&self) -> Result<Vec<Brand>, ApiError> {
        let api = self.api().clone();
        self.cache()
            .get_or_fetch(CacheKey::Brands, async move { api.get("/brands", None).await })
            .await
    }

    /// # Errors
    ///
    /// Returns the upstream error (duplicate names come back as 400/409).
    #[instrument(skip(self, token))]
    pub async fn create_brand(&self, name: &str, token: &AccessToken) -> Result<Brand, ApiError> {
        let brand = self
            .api()
            .post("/brands", &NameInput { name }, Some(token))
            .await?;
        self.invalidate(Invalidation::Brands);
        Ok(brand)
    }

    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self, token), fields(brand_id = %id))]
    pub async fn rename_brand(
        &self,
        id: BrandId,
        name: &str,
        token: &AccessToken,
    ) -> Result<Brand, ApiError> {
        let brand = self
            .api()
            .put(&format!("/brands/{id}"), &NameInput { name }, Some(token))
            .await?;
        self.invalidate(Invalidation::Brands);
        Ok(brand)
    }

    /// # Errors
    ///
    /// Returns the upstream error (brands with products are refused).
    #[instrument(skip(self, token), fields(brand_id = %id))]
    pub async fn delete_brand(&self, id: BrandId, token: &AccessToken) -> Result<(), ApiError> {
        self.api().delete(&format!("/brands/{id}"), Some(token)).await?;
        self.invalidate(Invalidation::Brands);
        Ok(())
    }

    /// Every category.
    ///
    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let api = self.api().clone();
        self.cache()
            .get_or_fetch(CacheKey::Categories, async move {
                api.get("/categories", None).await
            })
            .await
    }

    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self, token))]
    pub async fn create_category(
        &self,
        name: &str,
        token: &AccessToken,
    ) -> Result<Category, ApiError> {
        let category = self
            .api()
            .post("/categories", &NameInput { name }, Some(token))
            .await?;
        self.invalidate(Invalidation::Categories);
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self, token), fields(category_id = %id))]
    pub async fn rename_category(
        &self,
        id: CategoryId,
        name: &str,
        token: &AccessToken,
    ) -> Result<Category, ApiError> {
        let category = self
            .api()
            .put(&format!("/categories/{id}"), &NameInput { name }, Some(token))
            .await?;
        self.invalidate(Invalidation::Categories);
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self, token), fields(category_id = %id))]
    pub async fn delete_category(
        &self,
        id: CategoryId,
        token: &AccessToken,
    ) -> Result<(), ApiError> {
        self.api()
            .delete(&format!("/categories/{id}"), Some(token))
            .await?;
        self.invalidate(Invalidation::Categories);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::client::tests::client_for;
    use crate::transport::AccessToken;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_create_brand_refreshes_list() {
        let mut server = Server::new_async().await;
        let list = server
            .mock("GET", "/brands")
            .with_status(200)
            .with_body(r#"[{"id":1,"name":"Maison","product_count":3}]"#)
            .expect(2)
            .create_async()
            .await;
        server
            .mock("POST", "/brands")
            .match_body(Matcher::Json(serde_json::json!({"name": "Nord"})))
            .with_status(201)
            .with_body(r#"{"id":2,"name":"Nord"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        assert_eq!(client.brands().await.unwrap().len(), 1);
        client.brands().await.unwrap();

        let created = client
            .create_brand("Nord", &AccessToken::new("admin"))
            .await
            .unwrap();
        assert_eq!(created.name, "Nord");
        assert_eq!(created.product_count, 0);

        client.brands().await.unwrap();
        list.assert_async().await;
    }
}
