//! Login, registration and the current account.

use tracing::instrument;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{AuthSession, LoginRequest, RegisterRequest, User};
use crate::transport::AccessToken;

impl ApiClient {
    /// Exchange credentials for a token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for bad credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        self.api()
            .post("/auth/login", &LoginRequest { email, password }, None)
            .await
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns a status error carrying the backend's message (e.g. email taken).
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ApiError> {
        self.api()
            .post(
                "/auth/register",
                &RegisterRequest {
                    name,
                    email,
                    password,
                },
                None,
            )
            .await
    }

    /// The account behind a token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for expired tokens.
    #[instrument(skip(self, token))]
    pub async fn me(&self, token: &AccessToken) -> Result<User, ApiError> {
        self.api().get("/auth/me", Some(token)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::client::tests::client_for;
    use crate::error::ApiError;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_login_returns_session() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/login")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "email": "ada@example.com",
                "password": "hunter22"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"token":"t0k","user":{"id":1,"name":"Ada","email":"ada@example.com","role":"customer"}}"#,
            )
            .create_async()
            .await;

        let session = client_for(&server)
            .login("ada@example.com", "hunter22")
            .await
            .unwrap();

        assert_eq!(session.token, "t0k");
        assert!(!session.user.is_admin());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_bad_credentials() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .with_status(401)
            .with_body(r#"{"message":"Invalid email or password"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .login("ada@example.com", "wrong")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert_eq!(err.user_message(), "Invalid email or password");
    }
}
