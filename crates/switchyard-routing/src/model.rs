//! Model handles
//!
//! A `ModelHandle` wraps one provider client with everything the router
//! tracks about it: health, chat and streaming latency, weight and timeouts.
//! Routing strategies only see models through the `Model` trait.

use crate::config::{LatencyConfig, ModelConfig};
use crate::health::{ErrorBudget, HealthTracker};
use crate::latency::MovingAverage;
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use switchyard_core::chat::{ChatParams, ChatResponse, ChatStreamChunk};
use switchyard_core::{ChatClient, ChatStream, Error, Result};
use tracing::debug;

/// Default timeout for a single provider call
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Chunk waits shorter than this are not recorded as latency samples
const MIN_CHUNK_LATENCY: Duration = Duration::from_millis(1);

/// What a routing strategy needs to know about a model
pub trait Model: Send + Sync + 'static {
    fn id(&self) -> &str;

    fn healthy(&self) -> bool;

    fn weight(&self) -> u32;

    /// How long a least-latency pick keeps a model out of rotation
    fn latency_update_interval(&self) -> Duration;

    fn chat_latency(&self) -> &MovingAverage;

    fn chat_stream_latency(&self) -> &MovingAverage;
}

/// A configured model of a router
pub struct ModelHandle {
    model_id: String,
    weight: u32,
    client: Arc<dyn ChatClient>,
    health: HealthTracker,
    chat_latency: MovingAverage,
    chat_stream_latency: MovingAverage,
    latency_update_interval: Duration,
    client_timeout: Duration,
}

impl ModelHandle {
    /// Create a handle with default weight, error budget, latency and timeout settings
    pub fn new(model_id: impl Into<String>, client: Arc<dyn ChatClient>) -> Self {
        let latency = LatencyConfig::default();

        Self {
            model_id: model_id.into(),
            weight: 1,
            client,
            health: HealthTracker::new(&ErrorBudget::default()),
            chat_latency: latency.moving_average(),
            chat_stream_latency: latency.moving_average(),
            latency_update_interval: latency.update_interval(),
            client_timeout: DEFAULT_CLIENT_TIMEOUT,
        }
    }

    pub fn from_config(config: &ModelConfig, client: Arc<dyn ChatClient>) -> Self {
        Self::new(config.id.clone(), client)
            .with_weight(config.weight)
            .with_error_budget(&config.error_budget)
            .with_latency(&config.latency)
            .with_client_timeout(config.client.timeout())
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_error_budget(mut self, budget: &ErrorBudget) -> Self {
        self.health = HealthTracker::new(budget);
        self
    }

    pub fn with_latency(mut self, latency: &LatencyConfig) -> Self {
        self.chat_latency = latency.moving_average();
        self.chat_stream_latency = latency.moving_average();
        self.latency_update_interval = latency.update_interval();
        self
    }

    pub fn with_client_timeout(mut self, timeout: Duration) -> Self {
        self.client_timeout = timeout;
        self
    }

    pub fn provider(&self) -> &'static str {
        self.client.provider()
    }

    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    pub fn client_timeout(&self) -> Duration {
        self.client_timeout
    }

    pub fn supports_chat_stream(&self) -> bool {
        self.client.supports_chat_stream()
    }

    /// Send a chat request to the model
    ///
    /// Failures are recorded into the model health; successes update the chat
    /// latency estimate with the time per output token.
    pub async fn chat(&self, params: &ChatParams) -> Result<ChatResponse> {
        let started = Instant::now();

        let result = tokio::time::timeout(self.client_timeout, self.client.chat(params))
            .await
            .unwrap_or(Err(Error::Timeout(self.client_timeout)));

        match result {
            Ok(mut response) => {
                let tokens = response.model_response.token_usage.response_tokens.max(1);
                let latency = started.elapsed().as_secs_f64() / tokens as f64;
                self.chat_latency.add(latency);

                response.model_id = self.model_id.clone();
                Ok(response)
            }
            Err(err) => {
                self.health.track_err(&err);
                Err(err)
            }
        }
    }

    /// Open a chat stream on the model
    pub async fn chat_stream(&self, params: &ChatParams) -> Result<ModelStream<'_>> {
        let started = Instant::now();

        let result = tokio::time::timeout(self.client_timeout, self.client.chat_stream(params))
            .await
            .unwrap_or(Err(Error::Timeout(self.client_timeout)));

        match result {
            Ok(inner) => {
                self.chat_stream_latency.add(started.elapsed().as_secs_f64());

                Ok(ModelStream {
                    model: self,
                    inner,
                    last_chunk_at: Instant::now(),
                })
            }
            Err(err) => {
                self.health.track_err(&err);
                Err(err)
            }
        }
    }
}

impl Model for ModelHandle {
    fn id(&self) -> &str {
        &self.model_id
    }

    fn healthy(&self) -> bool {
        self.health.healthy()
    }

    fn weight(&self) -> u32 {
        self.weight
    }

    fn latency_update_interval(&self) -> Duration {
        self.latency_update_interval
    }

    fn chat_latency(&self) -> &MovingAverage {
        &self.chat_latency
    }

    fn chat_stream_latency(&self) -> &MovingAverage {
        &self.chat_stream_latency
    }
}

/// Chat stream opened on a model
///
/// Records chunk latency and errors into the model it came from. Dropping it
/// closes the provider stream.
pub struct ModelStream<'a> {
    model: &'a ModelHandle,
    inner: ChatStream,
    last_chunk_at: Instant,
}

impl ModelStream<'_> {
    /// Receive the next chunk; `None` means the stream completed
    pub async fn recv(&mut self) -> Option<Result<ChatStreamChunk>> {
        let item = self.inner.next().await?;

        let wait = self.last_chunk_at.elapsed();
        self.last_chunk_at = Instant::now();

        match item {
            Ok(mut chunk) => {
                if wait > MIN_CHUNK_LATENCY {
                    self.model.chat_stream_latency.add(wait.as_secs_f64());
                }

                chunk.model_id = self.model.model_id.clone();
                Some(Ok(chunk))
            }
            Err(err) => {
                debug!(model = %self.model.model_id, error = %err, "Stream chunk failed");
                self.model.health.track_err(&err);
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockChatClient, chat_response, stream_chunk};
    use switchyard_core::chat::ChatMessage;

    fn params() -> ChatParams {
        ChatParams {
            messages: vec![ChatMessage::user("hello")],
        }
    }

    #[tokio::test]
    async fn test_chat_stamps_model_id_and_records_latency() {
        let mut client = MockChatClient::new();
        client
            .expect_chat()
            .returning(|_| Ok(chat_response("hi", 10)));

        let model = ModelHandle::new("primary", Arc::new(client)).with_latency(&LatencyConfig {
            warmup_samples: 0,
            ..LatencyConfig::default()
        });

        let response = model.chat(&params()).await.unwrap();
        assert_eq!(response.model_id, "primary");
        assert!(model.chat_latency().warmed_up());
        assert!(!model.chat_stream_latency().warmed_up());
    }

    #[tokio::test]
    async fn test_chat_error_tracked_in_health() {
        let mut client = MockChatClient::new();
        client
            .expect_chat()
            .returning(|_| Err(Error::Unauthorized("bad key".to_string())));

        let model = ModelHandle::new("primary", Arc::new(client));
        assert!(model.healthy());

        assert!(model.chat(&params()).await.is_err());
        assert!(!model.healthy());
        assert!(!model.chat_latency().warmed_up());
    }

    struct SlowClient;

    #[async_trait::async_trait]
    impl ChatClient for SlowClient {
        fn provider(&self) -> &'static str {
            "slow"
        }

        async fn chat(&self, _params: &ChatParams) -> Result<ChatResponse> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(chat_response("late", 1))
        }

        fn supports_chat_stream(&self) -> bool {
            true
        }

        async fn chat_stream(&self, _params: &ChatParams) -> Result<ChatStream> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Box::new(futures::stream::empty()))
        }
    }

    #[tokio::test]
    async fn test_chat_timeout() {
        let model = ModelHandle::new("slow", Arc::new(SlowClient))
            .with_client_timeout(Duration::from_millis(10))
            .with_error_budget(&"1/h".parse().unwrap());

        let err = model.chat(&params()).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert!(!model.healthy());
    }

    #[tokio::test]
    async fn test_stream_open_timeout() {
        let model = ModelHandle::new("slow", Arc::new(SlowClient))
            .with_client_timeout(Duration::from_millis(10));

        let result = model.chat_stream(&params()).await;
        assert!(matches!(result, Err(Error::Timeout(_))));
        assert!(!model.chat_stream_latency().warmed_up());
    }

    #[tokio::test]
    async fn test_stream_stamps_chunks_and_tracks_errors() {
        let mut client = MockChatClient::new();
        client.expect_chat_stream().returning(|_| {
            let items: Vec<Result<ChatStreamChunk>> = vec![
                Ok(stream_chunk("a")),
                Err(Error::RateLimited {
                    retry_after: Some(Duration::from_secs(30)),
                }),
            ];
            Ok(Box::new(futures::stream::iter(items)) as ChatStream)
        });

        let model = ModelHandle::new("streamer", Arc::new(client));
        let mut stream = model.chat_stream(&params()).await.unwrap();

        let chunk = stream.recv().await.unwrap().unwrap();
        assert_eq!(chunk.model_id, "streamer");
        assert!(stream.recv().await.unwrap().is_err());
        assert!(stream.recv().await.is_none());

        drop(stream);
        assert!(!model.healthy());
        assert!(model.health().rate_limit_reset_in().is_some());
    }
}
