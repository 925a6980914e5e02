//! Provider client trait definitions

use crate::{
    Result,
    chat::{ChatParams, ChatResponse, ChatStreamChunk},
};
use futures::Stream;

/// Stream of chunks produced by a provider
///
/// Awaiting `ChatClient::chat_stream` opens the stream, polling it receives
/// chunks, the end of the stream is a normal termination, and dropping it
/// closes the underlying connection.
pub type ChatStream = Box<dyn Stream<Item = Result<ChatStreamChunk>> + Send + Unpin>;

/// Capability set of a single provider backend
///
/// Clients report failures through the `Error` taxonomy so the router can
/// classify them: `Error::Unauthorized` for rejected credentials,
/// `Error::RateLimited` for 429s (with the provider's retry hint), anything
/// else for transient failures.
#[async_trait::async_trait]
pub trait ChatClient: Send + Sync {
    /// Backend identifier (e.g. "openai"), used for logging and response tagging
    fn provider(&self) -> &'static str;

    /// Send a non-streaming chat request
    async fn chat(&self, params: &ChatParams) -> Result<ChatResponse>;

    /// Whether `chat_stream` is supported
    fn supports_chat_stream(&self) -> bool;

    /// Open a streaming chat request
    async fn chat_stream(&self, params: &ChatParams) -> Result<ChatStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::chat::{ChatMessage, ModelChunkResponse, ModelResponse, TokenUsage};
    use futures::StreamExt;
    use std::collections::HashMap;

    struct EchoClient;

    #[async_trait::async_trait]
    impl ChatClient for EchoClient {
        fn provider(&self) -> &'static str {
            "echo"
        }

        async fn chat(&self, params: &ChatParams) -> Result<ChatResponse> {
            let last = params
                .messages
                .last()
                .ok_or_else(|| Error::Provider("empty request".to_string()))?;

            Ok(ChatResponse {
                id: "echo-1".to_string(),
                created: 0,
                provider: self.provider().to_string(),
                router_id: String::new(),
                model_id: String::new(),
                model_name: "echo".to_string(),
                cached: false,
                model_response: ModelResponse {
                    metadata: HashMap::new(),
                    message: ChatMessage::assistant(last.content.clone()),
                    token_usage: TokenUsage::default(),
                },
            })
        }

        fn supports_chat_stream(&self) -> bool {
            true
        }

        async fn chat_stream(&self, params: &ChatParams) -> Result<ChatStream> {
            let chunks: Vec<Result<ChatStreamChunk>> = params
                .messages
                .iter()
                .map(|message| {
                    Ok(ChatStreamChunk {
                        id: String::new(),
                        created_at: 0,
                        provider: "echo".to_string(),
                        router_id: String::new(),
                        model_id: String::new(),
                        model_name: "echo".to_string(),
                        metadata: HashMap::new(),
                        model_response: ModelChunkResponse {
                            metadata: HashMap::new(),
                            message: ChatMessage::assistant(message.content.clone()),
                        },
                        finish_reason: None,
                    })
                })
                .collect();

            Ok(Box::new(futures::stream::iter(chunks)))
        }
    }

    #[tokio::test]
    async fn test_client_as_trait_object() {
        let client: Box<dyn ChatClient> = Box::new(EchoClient);
        let params = ChatParams {
            messages: vec![ChatMessage::user("ping")],
        };

        let response = client.chat(&params).await.unwrap();
        assert_eq!(response.model_response.message.content, "ping");
        assert_eq!(response.provider, "echo");
    }

    #[tokio::test]
    async fn test_stream_ends_normally() {
        let client = EchoClient;
        let params = ChatParams {
            messages: vec![ChatMessage::user("a"), ChatMessage::user("b")],
        };

        let stream = client.chat_stream(&params).await.unwrap();
        let contents: Vec<String> = stream
            .map(|chunk| chunk.unwrap().model_response.message.content)
            .collect()
            .await;

        assert_eq!(contents, vec!["a", "b"]);
    }
}
