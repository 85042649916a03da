//! Atelier admin library.
//!
//! This crate provides the admin console as a library, allowing the router
//! to be built and exercised in tests without binding a socket.
//!
//! # Security
//!
//! Every page except login requires a backend session whose user has the
//! admin role. The console holds that user's bearer token in its session and
//! never stores credentials of its own.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod views;

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, middleware as axum_middleware, routing::get};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// Directory static assets are served from, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/admin/static";

/// Build the full admin router.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(session_layer)
        .layer(axum_middleware::from_fn(middleware::security_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the backend API is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.api().backend_health().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Backend not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use mockito::Server;
    use tower::ServiceExt;

    use super::*;
    use crate::config::tests::test_config;

    fn app_for(server: &Server) -> Router {
        app(AppState::new(test_config(&server.url())).unwrap())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn login_request(email: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "email={}&password=hunter22",
                urlencoding::encode(email)
            )))
            .unwrap()
    }

    fn auth_body(role: &str) -> String {
        serde_json::json!({
            "token": "backend-token",
            "user": {"id": 1, "name": "Ada", "email": "ada@example.com", "role": role}
        })
        .to_string()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_always_ok() {
        let server = Server::new_async().await;
        let response = app_for(&server).oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    }

    #[tokio::test]
    async fn test_login_page_renders() {
        let server = Server::new_async().await;
        let response = app_for(&server)
            .oneshot(get_request("/auth/login"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Sign in"));
    }

    #[tokio::test]
    async fn test_dashboard_requires_login() {
        let server = Server::new_async().await;
        let response = app_for(&server).oneshot(get_request("/")).await.unwrap();
        assert!(response.status().is_redirection());
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/auth/login");
    }

    #[tokio::test]
    async fn test_customer_cannot_sign_in() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .with_header("content-type", "application/json")
            .with_body(auth_body("customer"))
            .create_async()
            .await;

        let response = app_for(&server)
            .oneshot(login_request("ada@example.com"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(response).await.contains("does not have admin access"));
    }

    #[tokio::test]
    async fn test_invalid_email_is_rejected_locally() {
        let server = Server::new_async().await;
        let response = app_for(&server)
            .oneshot(login_request("not-an-email"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_signs_in_and_sees_dashboard() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .with_header("content-type", "application/json")
            .with_body(auth_body("admin"))
            .create_async()
            .await;
        server
            .mock("GET", "/orders")
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let app = app_for(&server);
        let response = app
            .clone()
            .oneshot(login_request("ada@example.com"))
            .await
            .unwrap();
        assert!(response.status().is_redirection());
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Dashboard"));
        assert!(body.contains("Ada"));
    }
}
