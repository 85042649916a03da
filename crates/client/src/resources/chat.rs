//! AI shopping assistant.

use tracing::instrument;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{ChatReply, ChatRequest, ChatTurn};
use crate::transport::AccessToken;

impl ApiClient {
    /// Send a message with the prior conversation and return the reply.
    ///
    /// Anonymous visitors may chat; signed-in users send their token so the
    /// assistant can see their orders.
    ///
    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self, message, history, token), fields(turns = history.len()))]
    pub async fn chat(
        &self,
        message: &str,
        history: &[ChatTurn],
        token: Option<&AccessToken>,
    ) -> Result<String, ApiError> {
        let reply: ChatReply = self
            .api()
            .post("/chat", &ChatRequest { message, history }, token)
            .await?;
        Ok(reply.reply)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::client::tests::client_for;
    use crate::models::{ChatRole, ChatTurn};
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_chat_sends_history() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "message": "and shoes?",
                "history": [{"role": "assistant", "content": "Try the linen shirt."}]
            })))
            .with_status(200)
            .with_body(r#"{"reply":"The suede loafers pair well."}"#)
            .create_async()
            .await;

        let history = vec![ChatTurn {
            role: ChatRole::Assistant,
            content: "Try the linen shirt.".to_string(),
        }];
        let reply = client_for(&server)
            .chat("and shoes?", &history, None)
            .await
            .unwrap();

        assert_eq!(reply, "The suede loafers pair well.");
        mock.assert_async().await;
    }
}
