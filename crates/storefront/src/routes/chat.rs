//! Shopping assistant.
//!
//! The conversation lives in the session and is sent along with every
//! message so the assistant keeps context.

use askama::Template;
use askama_web::WebTemplate;
use atelier_client::{ChatRole, ChatTurn};
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::error::Result;
use crate::filters;
use crate::middleware::{OptionalAuth, load_chat, save_chat};
use crate::models::{Flash, session_keys};
use crate::routes::{is_htmx, redirect_with_flash};
use crate::state::AppState;
use crate::views::Layout;

/// Longest message accepted.
const MAX_MESSAGE_LEN: usize = 1_000;

/// A rendered conversation turn.
#[derive(Clone)]
pub struct TurnView {
    pub from_user: bool,
    pub content: String,
}

impl From<&ChatTurn> for TurnView {
    fn from(turn: &ChatTurn) -> Self {
        Self {
            from_user: turn.role == ChatRole::User,
            content: turn.content.clone(),
        }
    }
}

/// Chat page template.
#[derive(Template, WebTemplate)]
#[template(path = "chat.html")]
pub struct ChatTemplate {
    pub layout: Layout,
    pub turns: Vec<TurnView>,
    pub error: Option<String>,
}

/// Conversation fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/chat_turns.html")]
pub struct ChatTurnsTemplate {
    pub turns: Vec<TurnView>,
    pub error: Option<String>,
}

/// Chat form data.
#[derive(Debug, Deserialize)]
pub struct ChatForm {
    pub message: String,
}

/// Display the conversation.
#[instrument(skip(session, user))]
pub async fn show(session: Session, OptionalAuth(user): OptionalAuth) -> ChatTemplate {
    let history = load_chat(&session).await;
    ChatTemplate {
        layout: Layout::load(&session, user.as_ref()).await,
        turns: history.iter().map(TurnView::from).collect(),
        error: None,
    }
}

/// Send a message and append the reply.
///
/// Signed-in users send their token so the assistant can look at their
/// orders; the conversation itself is never sent anywhere else.
#[instrument(skip(state, session, user, headers, form))]
pub async fn send(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    headers: HeaderMap,
    Form(form): Form<ChatForm>,
) -> Result<Response> {
    let message = form.message.trim().to_string();
    let mut history = load_chat(&session).await;

    let error = if message.is_empty() {
        Some("Type a message first.".to_string())
    } else if message.chars().count() > MAX_MESSAGE_LEN {
        Some(format!("Messages are limited to {MAX_MESSAGE_LEN} characters."))
    } else {
        let token = user.as_ref().map(|u| u.token());
        match state.api().chat(&message, &history, token.as_ref()).await {
            Ok(reply) => {
                history.push(ChatTurn {
                    role: ChatRole::User,
                    content: message,
                });
                history.push(ChatTurn {
                    role: ChatRole::Assistant,
                    content: reply,
                });
                save_chat(&session, history.clone()).await?;
                None
            }
            Err(e) => {
                warn!(error = %e, "Assistant unavailable");
                Some("The assistant is unavailable right now. Please try again.".to_string())
            }
        }
    };

    if is_htmx(&headers) {
        // Show what was kept, which may be shorter than what was sent
        let history = load_chat(&session).await;
        return Ok(ChatTurnsTemplate {
            turns: history.iter().map(TurnView::from).collect(),
            error,
        }
        .into_response());
    }

    Ok(match error {
        Some(message) => redirect_with_flash(&session, Flash::error(message), "/chat").await,
        None => Redirect::to("/chat").into_response(),
    })
}

/// Forget the conversation.
#[instrument(skip(session))]
pub async fn reset(session: Session) -> Result<Redirect> {
    session.remove::<Vec<ChatTurn>>(session_keys::CHAT).await?;
    Ok(Redirect::to("/chat"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_view_marks_user_messages() {
        let turn = ChatTurn {
            role: ChatRole::User,
            content: "Hi".to_string(),
        };
        assert!(TurnView::from(&turn).from_user);
    }
}
