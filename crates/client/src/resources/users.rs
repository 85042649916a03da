//! Accounts and favorites.

use tracing::instrument;

use atelier_core::catalog::Product;
use atelier_core::{ProductId, Role, UserId};

use crate::cache::{CacheKey, Invalidation};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{RoleUpdate, User};
use crate::transport::AccessToken;

impl ApiClient {
    /// Every account (admin).
    ///
    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self, token))]
    pub async fn users(&self, token: &AccessToken) -> Result<Vec<User>, ApiError> {
        self.api().get("/users", Some(token)).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown IDs.
    #[instrument(skip(self, token), fields(user_id = %id))]
    pub async fn user(&self, id: UserId, token: &AccessToken) -> Result<User, ApiError> {
        self.api().get(&format!("/users/{id}"), Some(token)).await
    }

    /// Change an account's role (admin).
    ///
    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self, token), fields(user_id = %id, role = %role))]
    pub async fn update_user_role(
        &self,
        id: UserId,
        role: Role,
        token: &AccessToken,
    ) -> Result<User, ApiError> {
        self.api()
            .put(&format!("/users/{id}"), &RoleUpdate { role }, Some(token))
            .await
    }

    /// Delete an account (admin).
    ///
    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self, token), fields(user_id = %id))]
    pub async fn delete_user(&self, id: UserId, token: &AccessToken) -> Result<(), ApiError> {
        self.api().delete(&format!("/users/{id}"), Some(token)).await?;
        self.invalidate(Invalidation::Favorites(id));
        Ok(())
    }

    /// The signed-in user's favorite products.
    ///
    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self, token), fields(user_id = %user))]
    pub async fn favorites(&self, user: UserId, token: &AccessToken) -> Result<Vec<Product>, ApiError> {
        let api = self.api().clone();
        let token = AccessToken::new(token.expose());
        self.cache()
            .get_or_fetch(CacheKey::Favorites(user), async move {
                api.get("/users/me/favorites", Some(&token)).await
            })
            .await
    }

    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self, token), fields(user_id = %user, product_id = %product))]
    pub async fn add_favorite(
        &self,
        user: UserId,
        product: ProductId,
        token: &AccessToken,
    ) -> Result<(), ApiError> {
        self.api()
            .post_no_content(
                &format!("/users/me/favorites/{product}"),
                &serde_json::json!({}),
                Some(token),
            )
            .await?;
        self.invalidate(Invalidation::Favorites(user));
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self, token), fields(user_id = %user, product_id = %product))]
    pub async fn remove_favorite(
        &self,
        user: UserId,
        product: ProductId,
        token: &AccessToken,
    ) -> Result<(), ApiError> {
        self.api()
            .delete(&format!("/users/me/favorites/{product}"), Some(token))
            .await?;
        self.invalidate(Invalidation::Favorites(user));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::products::tests::product_json;
    use crate::client::tests::client_for;
    use crate::transport::AccessToken;
    use atelier_core::{ProductId, Role, UserId};
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_favorites_cached_per_user_until_changed() {
        let mut server = Server::new_async().await;
        let list = server
            .mock("GET", "/users/me/favorites")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_body(format!("[{}]", product_json(4)))
            .expect(2)
            .create_async()
            .await;
        server
            .mock("DELETE", "/users/me/favorites/4")
            .with_status(204)
            .create_async()
            .await;

        let client = client_for(&server);
        let token = AccessToken::new("tok");
        let user = UserId::new(1);

        assert_eq!(client.favorites(user, &token).await.unwrap().len(), 1);
        client.favorites(user, &token).await.unwrap();
        client
            .remove_favorite(user, ProductId::new(4), &token)
            .await
            .unwrap();
        client.favorites(user, &token).await.unwrap();

        list.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_role_sends_snake_case() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/users/3")
            .match_body(Matcher::Json(serde_json::json!({"role": "admin"})))
            .with_status(200)
            .with_body(r#"{"id":3,"name":"Bo","email":"bo@example.com","role":"admin"}"#)
            .create_async()
            .await;

        let user = client_for(&server)
            .update_user_role(UserId::new(3), Role::Admin, &AccessToken::new("tok"))
            .await
            .unwrap();

        assert!(user.is_admin());
        mock.assert_async().await;
    }
}
