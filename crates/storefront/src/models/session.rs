//! Session-related types.
//!
//! Types stored in the session for authentication state and one-shot
//! messages. The cart and chat history are stored under their own keys as
//! `atelier_core::cart::Cart` and `Vec<atelier_client::ChatTurn>`.

use atelier_client::{AccessToken, AuthSession};
use atelier_core::{Role, UserId};
use serde::{Deserialize, Serialize};

/// Session-stored user identity.
///
/// Holds the backend-issued bearer token so handlers can call the API on the
/// user's behalf. Sessions are kept server-side; the cookie only carries the
/// session ID.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    token: String,
}

impl CurrentUser {
    /// Bearer token for backend calls.
    #[must_use]
    pub fn token(&self) -> AccessToken {
        AccessToken::new(self.token.as_str())
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// First name for greetings.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

impl From<AuthSession> for CurrentUser {
    fn from(auth: AuthSession) -> Self {
        Self {
            id: auth.user.id,
            name: auth.user.name,
            email: auth.user.email,
            role: auth.user.role,
            token: auth.token,
        }
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Kind of one-shot message, used as a CSS modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "alert-success",
            Self::Error => "alert-error",
            Self::Info => "alert-info",
        }
    }
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            message: message.into(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the shopping cart.
    pub const CART: &str = "cart";

    /// Key for the pending one-shot message.
    pub const FLASH: &str = "flash";

    /// Key for the assistant conversation.
    pub const CHAT: &str = "chat_history";

    /// Key for the page to return to after login.
    pub const RETURN_TO: &str = "return_to";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use atelier_client::User;

    fn auth() -> AuthSession {
        AuthSession {
            token: "tok-123".to_string(),
            user: User {
                id: UserId::new(7),
                name: "Ada Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                role: Role::Customer,
                created_at: None,
            },
        }
    }

    #[test]
    fn test_current_user_from_auth_session() {
        let user = CurrentUser::from(auth());
        assert_eq!(user.id, UserId::new(7));
        assert_eq!(user.token().expose(), "tok-123");
        assert_eq!(user.first_name(), "Ada");
        assert!(!user.is_admin());
    }

    #[test]
    fn test_debug_hides_token() {
        let output = format!("{:?}", CurrentUser::from(auth()));
        assert!(!output.contains("tok-123"));
    }

    #[test]
    fn test_current_user_survives_session_serialization() {
        let json = serde_json::to_value(CurrentUser::from(auth())).unwrap();
        let back: CurrentUser = serde_json::from_value(json).unwrap();
        assert_eq!(back.token().expose(), "tok-123");
    }
}
