//! Session middleware configuration and session-held state.
//!
//! Sessions live in memory; the backend owns every durable record. The
//! visitor's cart, chat history and pending flash message are stored here.

use atelier_client::ChatTurn;
use atelier_core::cart::Cart;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::config::StorefrontConfig;
use crate::models::{Flash, session_keys};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "atelier_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Conversation turns kept in the session.
pub const MAX_CHAT_TURNS: usize = 20;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Load the visitor's cart, or an empty one.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_cart(session: &Session) -> Result<Cart, tower_sessions::session::Error> {
    Ok(session
        .get::<Cart>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

/// Store the visitor's cart.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
}

/// Queue a message for the next rendered page.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn set_flash(session: &Session, flash: Flash) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::FLASH, flash).await
}

/// Take the pending message, if any. It is shown once.
pub async fn take_flash(session: &Session) -> Option<Flash> {
    session
        .remove::<Flash>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
}

/// Load the assistant conversation.
pub async fn load_chat(session: &Session) -> Vec<ChatTurn> {
    session
        .get::<Vec<ChatTurn>>(session_keys::CHAT)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Store the assistant conversation, keeping only the latest turns.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_chat(
    session: &Session,
    mut history: Vec<ChatTurn>,
) -> Result<(), tower_sessions::session::Error> {
    if history.len() > MAX_CHAT_TURNS {
        history.drain(..history.len() - MAX_CHAT_TURNS);
    }
    session.insert(session_keys::CHAT, history).await
}

/// Remember where to send the visitor after login.
///
/// Only local paths are accepted.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn set_return_to(session: &Session, path: &str) -> Result<(), tower_sessions::session::Error> {
    if is_local_path(path) {
        session.insert(session_keys::RETURN_TO, path).await?;
    }
    Ok(())
}

/// Take the post-login destination, defaulting to the home page.
pub async fn take_return_to(session: &Session) -> String {
    session
        .remove::<String>(session_keys::RETURN_TO)
        .await
        .ok()
        .flatten()
        .filter(|p| is_local_path(p))
        .unwrap_or_else(|| "/".to_string())
}

/// A same-site absolute path (rejects `//host` and schemes).
pub fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains("://")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use atelier_client::ChatRole;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_flash_is_shown_once() {
        let session = session();
        set_flash(&session, Flash::success("Saved")).await.unwrap();

        assert_eq!(take_flash(&session).await, Some(Flash::success("Saved")));
        assert_eq!(take_flash(&session).await, None);
    }

    #[tokio::test]
    async fn test_chat_history_is_capped() {
        let session = session();
        let history: Vec<ChatTurn> = (0..25)
            .map(|i| ChatTurn {
                role: ChatRole::User,
                content: format!("message {i}"),
            })
            .collect();

        save_chat(&session, history).await.unwrap();
        let kept = load_chat(&session).await;

        assert_eq!(kept.len(), MAX_CHAT_TURNS);
        assert_eq!(kept[0].content, "message 5");
        assert_eq!(kept[19].content, "message 24");
    }

    #[tokio::test]
    async fn test_missing_cart_is_empty() {
        let cart = load_cart(&session()).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_return_to_rejects_other_hosts() {
        let session = session();
        set_return_to(&session, "//evil.example/phish").await.unwrap();
        assert_eq!(take_return_to(&session).await, "/");

        set_return_to(&session, "/checkout").await.unwrap();
        assert_eq!(take_return_to(&session).await, "/checkout");
    }
}
