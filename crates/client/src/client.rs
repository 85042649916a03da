//! The combined client used by the web tiers.

use std::sync::Arc;

use tracing::instrument;

use crate::cache::{Invalidation, QueryCache};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::transport::Transport;

/// Backend transport, recommendation transport and the query cache.
///
/// Cheap to clone; all clones share the same connection pools and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    api: Transport,
    recommend: Transport,
    cache: QueryCache,
}

impl ApiClient {
    /// Create a client from config.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self {
            inner: Arc::new(ApiClientInner {
                api: Transport::new(&config.api_url, config.timeout)?,
                recommend: Transport::new(&config.recommend_url, config.timeout)?,
                cache: QueryCache::new(config.cache_capacity, config.cache_ttl),
            }),
        })
    }

    pub(crate) fn api(&self) -> &Transport {
        &self.inner.api
    }

    pub(crate) fn recommender(&self) -> &Transport {
        &self.inner.recommend
    }

    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    /// Apply an invalidation rule after a mutation.
    pub fn invalidate(&self, rule: Invalidation) {
        self.inner.cache.invalidate(rule);
    }

    /// Whether the backend answers its health endpoint.
    ///
    /// # Errors
    ///
    /// Returns the upstream error when the backend is unreachable or unhealthy.
    #[instrument(skip(self))]
    pub async fn backend_health(&self) -> Result<(), ApiError> {
        self.inner.api.ping("/health").await
    }

    /// Whether the recommendation service answers its health endpoint.
    ///
    /// # Errors
    ///
    /// Returns the upstream error when the service is unreachable or unhealthy.
    #[instrument(skip(self))]
    pub async fn recommender_health(&self) -> Result<(), ApiError> {
        self.inner.recommend.ping("/health").await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mockito::Server;

    /// A client pointed at one mock server for both upstreams.
    #[allow(clippy::unwrap_used)]
    pub fn client_for(server: &Server) -> ApiClient {
        ApiClient::new(&ClientConfig::new(server.url(), server.url())).unwrap()
    }

    #[tokio::test]
    async fn test_health_checks() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .with_body("ok")
            .expect_at_least(1)
            .create_async()
            .await;

        let client = client_for(&server);
        assert!(client.backend_health().await.is_ok());
        assert!(client.recommender_health().await.is_ok());
    }

    #[tokio::test]
    async fn test_health_reports_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(500)
            .create_async()
            .await;

        assert!(client_for(&server).backend_health().await.is_err());
    }
}
