//! Request and response bodies that only exist on the wire.
//!
//! Catalog, order and recommendation records live in `atelier-core`; this
//! module holds the envelopes around them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_core::catalog::Variant;
use atelier_core::recommend::ScoredProduct;
use atelier_core::{BrandId, CategoryId, Money, OrderStatus, Role, UserId};

/// A shop account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Response to login and registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// A review as submitted by a shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewInput {
    pub rating: u8,
    pub comment: String,
}

/// Product create/update body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub brand_id: BrandId,
    pub category_id: CategoryId,
    pub price: Money,
    pub discount_percent: u8,
    pub images: Vec<String>,
    pub variants: Vec<Variant>,
}

/// Brand or category create/rename body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameInput<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleUpdate {
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// Who said a chat line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One line of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub history: &'a [ChatTurn],
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

/// Recommendation service response.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoredList {
    #[serde(default)]
    pub items: Vec<ScoredProduct>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_session_deserializes() {
        let json = r#"{
            "token": "abc",
            "user": {"id": 7, "name": "Ada", "email": "ada@example.com", "role": "admin"}
        }"#;
        let session: AuthSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.token, "abc");
        assert!(session.user.is_admin());
        assert!(session.user.created_at.is_none());
    }

    #[test]
    fn test_chat_request_shape() {
        let history = vec![ChatTurn {
            role: ChatRole::User,
            content: "hi".to_string(),
        }];
        let body = serde_json::to_value(ChatRequest {
            message: "what goes with linen?",
            history: &history,
        })
        .unwrap();
        assert_eq!(body["history"][0]["role"], "user");
        assert_eq!(body["message"], "what goes with linen?");
    }
}
