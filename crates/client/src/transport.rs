//! Shared HTTP transport.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::error::ApiError;

/// A bearer token issued by the backend at login.
#[derive(Debug)]
pub struct AccessToken(SecretString);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for storing in the visitor's session.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// One upstream service: base URL plus a shared `reqwest` client.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<TransportInner>,
}

struct TransportInner {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl Transport {
    /// Create a transport for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("atelier/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(TransportInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn request(&self, method: Method, path: &str, token: Option<&AccessToken>) -> RequestBuilder {
        let url = format!("{}{path}", self.inner.base_url);
        let builder = self.inner.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        }
    }

    /// GET and decode JSON. Retried once.
    ///
    /// # Errors
    ///
    /// Returns the normalized upstream error.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&AccessToken>,
    ) -> Result<T, ApiError> {
        let body = self
            .send_idempotent(|| self.request(Method::GET, path, token))
            .await?;
        decode(path, &body)
    }

    /// GET with a query string and decode JSON. Retried once.
    ///
    /// # Errors
    ///
    /// Returns the normalized upstream error.
    pub async fn get_with_query<Q, T>(
        &self,
        path: &str,
        query: &Q,
        token: Option<&AccessToken>,
    ) -> Result<T, ApiError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .send_idempotent(|| self.request(Method::GET, path, token).query(query))
            .await?;
        decode(path, &body)
    }

    /// POST a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns the normalized upstream error.
    pub async fn post<B, T>(&self, path: &str, body: &B, token: Option<&AccessToken>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let text = self
            .send(self.request(Method::POST, path, token).json(body))
            .await?;
        decode(path, &text)
    }

    /// POST a JSON body, ignoring the response body.
    ///
    /// # Errors
    ///
    /// Returns the normalized upstream error.
    pub async fn post_no_content<B>(
        &self,
        path: &str,
        body: &B,
        token: Option<&AccessToken>,
    ) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::POST, path, token).json(body))
            .await
            .map(drop)
    }

    /// PUT a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns the normalized upstream error.
    pub async fn put<B, T>(&self, path: &str, body: &B, token: Option<&AccessToken>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let text = self
            .send(self.request(Method::PUT, path, token).json(body))
            .await?;
        decode(path, &text)
    }

    /// DELETE. Any response body (including none) is accepted.
    ///
    /// # Errors
    ///
    /// Returns the normalized upstream error.
    pub async fn delete(&self, path: &str, token: Option<&AccessToken>) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, path, token))
            .await
            .map(drop)
    }

    /// GET a path and only check for success. Used by readiness probes.
    ///
    /// # Errors
    ///
    /// Returns the normalized upstream error.
    pub async fn ping(&self, path: &str) -> Result<(), ApiError> {
        self.send(self.request(Method::GET, path, None))
            .await
            .map(drop)
    }

    async fn send_idempotent<F>(&self, build: F) -> Result<String, ApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        match self.send(build()).await {
            Err(err) if err.is_retryable() => {
                warn!(error = %err, "Idempotent request failed, retrying once");
                self.send(build()).await
            }
            other => other,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        let retry_after = if status == StatusCode::TOO_MANY_REQUESTS {
            response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
        } else {
            None
        };

        let body = response.text().await?;

        if !status.is_success() {
            if status.is_server_error() {
                error!(
                    status = %status,
                    body = %body.chars().take(500).collect::<String>(),
                    "Upstream returned server error"
                );
            } else {
                debug!(status = %status, "Upstream returned client error");
            }
            return Err(ApiError::from_response(status, retry_after, &body));
        }

        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        error!(
            path,
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse upstream response"
        );
        ApiError::from(e)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pong {
        ok: bool,
    }

    fn transport(server: &Server) -> Transport {
        Transport::new(&server.url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_get_sends_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/auth/me")
            .match_header("authorization", "Bearer secret-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let token = AccessToken::new("secret-token");
        let pong: Pong = transport(&server).get("/auth/me", Some(&token)).await.unwrap();

        assert!(pong.ok);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_retries_once_on_server_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/products/1")
            .with_status(503)
            .with_body("upstream down")
            .expect(2)
            .create_async()
            .await;

        let err = transport(&server)
            .get::<Pong>("/products/1", None)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_does_not_retry_client_errors() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/products/9")
            .with_status(404)
            .with_body(r#"{"message":"Product not found"}"#)
            .expect(1)
            .create_async()
            .await;

        let err = transport(&server)
            .get::<Pong>("/products/9", None)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Product not found"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/orders")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let result = transport(&server)
            .post::<_, Pong>("/orders", &serde_json::json!({}), None)
            .await;

        assert!(result.is_err());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_query_string_is_encoded() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/products")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("keyword".into(), "linen shirt".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let query = [("keyword", "linen shirt"), ("page", "2")];
        let pong: Pong = transport(&server)
            .get_with_query("/products", &query, None)
            .await
            .unwrap();

        assert!(pong.ok);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_accepts_empty_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/brands/3")
            .with_status(204)
            .create_async()
            .await;

        transport(&server).delete("/brands/3", None).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .with_status(429)
            .with_header("Retry-After", "12")
            .create_async()
            .await;

        let err = transport(&server)
            .post::<_, Pong>("/auth/login", &serde_json::json!({}), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::RateLimited(12)));
    }

    #[tokio::test]
    async fn test_malformed_json_is_decode_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/brands")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = transport(&server).get::<Pong>("/brands", None).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
