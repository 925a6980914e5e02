//! Test doubles shared by unit tests

use crate::latency::MovingAverage;
use crate::model::Model;
use async_trait::async_trait;
use mockall::mock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use switchyard_core::chat::{
    ChatMessage, ChatParams, ChatResponse, ChatStreamChunk, ModelChunkResponse, ModelResponse,
    TokenUsage,
};
use switchyard_core::{ChatClient, ChatStream, Result};

mock! {
    pub ChatClient {}

    #[async_trait]
    impl ChatClient for ChatClient {
        fn provider(&self) -> &'static str;
        async fn chat(&self, params: &ChatParams) -> Result<ChatResponse>;
        fn supports_chat_stream(&self) -> bool;
        async fn chat_stream(&self, params: &ChatParams) -> Result<ChatStream>;
    }
}

pub fn chat_response(content: &str, response_tokens: u32) -> ChatResponse {
    ChatResponse {
        id: "resp-1".to_string(),
        created: 1_700_000_000,
        provider: "mock".to_string(),
        router_id: String::new(),
        model_id: String::new(),
        model_name: "mock-model".to_string(),
        cached: false,
        model_response: ModelResponse {
            metadata: HashMap::new(),
            message: ChatMessage::assistant(content),
            token_usage: TokenUsage {
                prompt_tokens: 5,
                response_tokens,
                total_tokens: 5 + response_tokens,
            },
        },
    }
}

pub fn stream_chunk(content: &str) -> ChatStreamChunk {
    ChatStreamChunk {
        id: String::new(),
        created_at: 1_700_000_000,
        provider: "mock".to_string(),
        router_id: String::new(),
        model_id: String::new(),
        model_name: "mock-model".to_string(),
        metadata: HashMap::new(),
        model_response: ModelChunkResponse {
            metadata: HashMap::new(),
            message: ChatMessage::assistant(content),
        },
        finish_reason: None,
    }
}

/// Model with directly controllable health, for strategy tests
pub struct FakeModel {
    id: String,
    weight: u32,
    healthy: AtomicBool,
    update_interval: Duration,
    chat_latency: MovingAverage,
    chat_stream_latency: MovingAverage,
}

impl FakeModel {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            weight: 1,
            healthy: AtomicBool::new(true),
            update_interval: Duration::from_secs(30),
            chat_latency: MovingAverage::new(0.06, 3),
            chat_stream_latency: MovingAverage::new(0.06, 3),
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

impl Model for FakeModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    fn weight(&self) -> u32 {
        self.weight
    }

    fn latency_update_interval(&self) -> Duration {
        self.update_interval
    }

    fn chat_latency(&self) -> &MovingAverage {
        &self.chat_latency
    }

    fn chat_stream_latency(&self) -> &MovingAverage {
        &self.chat_stream_latency
    }
}

/// Wrap fake models into the shared pool a strategy expects
pub fn pool(models: Vec<FakeModel>) -> Arc<Vec<Arc<FakeModel>>> {
    Arc::new(models.into_iter().map(Arc::new).collect())
}
