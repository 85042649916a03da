//! Session-related types for admin authentication.
//!
//! Types stored in the session for authentication state.

use atelier_client::{AccessToken, AuthSession};
use atelier_core::UserId;
use serde::{Deserialize, Serialize};

/// Session-stored admin identity.
///
/// Only built from a backend session whose user has the admin role.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Admin's backend user ID.
    pub id: UserId,
    /// Admin's email address.
    pub email: String,
    /// Admin's display name.
    pub name: String,
    token: String,
}

impl CurrentAdmin {
    /// Keep the session only if it belongs to an admin.
    #[must_use]
    pub fn from_auth(auth: AuthSession) -> Option<Self> {
        auth.user.is_admin().then(|| Self {
            id: auth.user.id,
            email: auth.user.email,
            name: auth.user.name,
            token: auth.token,
        })
    }

    /// Bearer token for backend calls.
    #[must_use]
    pub fn token(&self) -> AccessToken {
        AccessToken::new(self.token.as_str())
    }
}

impl std::fmt::Debug for CurrentAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentAdmin")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Kind of one-shot message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
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

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.kind, FlashKind::Error)
    }
}

/// Session keys for admin data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// Key for the pending flash message.
    pub const FLASH: &str = "flash";
}
