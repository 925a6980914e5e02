//! Language router
//!
//! A `LangRouter` owns a fixed pool of models and serves chat requests with
//! automatic failover:
//! 1. A fresh strategy iterator and retry iterator per request
//! 2. Pull the next healthy candidate and call it
//! 3. On failure, the model records the error into its health tracker, the
//!    router backs off and pulls again until the retry budget is spent
//!
//! Streaming requests run the same loop in one spawned task that forwards
//! chunks to the caller. A model failing mid-stream produces one
//! `model_unavailable` event and the next candidate restarts the stream.

use crate::config::RouterConfig;
use crate::model::{Model, ModelHandle};
use crate::retry::ExpRetry;
use crate::strategy::{
    LatencySource, ModelPool, RoutingStrategy, RoutingStrategyKind, StrategyError, build_strategy,
};
use std::sync::Arc;
use std::time::Instant;
use switchyard_core::chat::{
    ChatRequest, ChatResponse, ChatStreamChunk, ChatStreamError, ChatStreamRequest, FinishReason,
};
use switchyard_core::{Error, ErrorCode, Result};
use switchyard_observability::{RequestKind, RoutingMetrics};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// Buffered chunks per stream before the forwarding task waits for the consumer
const STREAM_CHANNEL_CAPACITY: usize = 32;

/// Item of a chat stream: a chunk or an error event
pub type ChatStreamResult = std::result::Result<ChatStreamChunk, ChatStreamError>;

/// Caller side of a chat stream; dropping it cancels the stream
pub type ChatStreamReceiver = ReceiverStream<ChatStreamResult>;

/// Router identity plus optional metrics, shared with streaming tasks
#[derive(Clone)]
struct Telemetry {
    router_id: String,
    metrics: Option<Arc<RoutingMetrics>>,
}

impl Telemetry {
    fn success(&self, model: &ModelHandle, kind: RequestKind, started: Instant) {
        if let Some(metrics) = &self.metrics {
            metrics.record_model_success(
                &self.router_id,
                model.id(),
                kind,
                started.elapsed().as_secs_f64(),
            );
            self.model_state(metrics, model);
        }
    }

    fn failure(&self, model: &ModelHandle, kind: RequestKind, err: &Error, started: Instant) {
        warn!(
            router = %self.router_id,
            model = model.id(),
            kind = kind.as_str(),
            error = %err,
            healthy = model.healthy(),
            "Model request failed"
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_model_failure(
                &self.router_id,
                model.id(),
                kind,
                err.code().as_str(),
                started.elapsed().as_secs_f64(),
            );
            self.model_state(metrics, model);
        }
    }

    /// The request moves on from `model` to another attempt
    fn failover(&self, model: &ModelHandle, kind: RequestKind) {
        if let Some(metrics) = &self.metrics {
            metrics.record_failover(&self.router_id, model.id(), kind);
        }
    }

    fn exhausted(&self, kind: RequestKind, code: ErrorCode) {
        warn!(
            router = %self.router_id,
            kind = kind.as_str(),
            code = code.as_str(),
            "No model could serve the request"
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_exhausted(&self.router_id, kind, code.as_str());
        }
    }

    fn chunk(&self, model: &ModelHandle) {
        if let Some(metrics) = &self.metrics {
            metrics.record_stream_chunk(&self.router_id, model.id());
        }
    }

    fn model_state(&self, metrics: &RoutingMetrics, model: &ModelHandle) {
        metrics.update_model_state(
            &self.router_id,
            model.id(),
            model.healthy(),
            model.chat_latency().value(),
            model.chat_stream_latency().value(),
        );
    }
}

pub struct LangRouter {
    telemetry: Telemetry,
    strategy: RoutingStrategyKind,
    chat_models: ModelPool<ModelHandle>,
    chat_stream_models: ModelPool<ModelHandle>,
    chat_routing: Arc<dyn RoutingStrategy<ModelHandle>>,
    chat_stream_routing: Arc<dyn RoutingStrategy<ModelHandle>>,
    retry: ExpRetry,
}

impl std::fmt::Debug for LangRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LangRouter")
            .field("strategy", &self.strategy)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl LangRouter {
    /// Create a router over `models`
    ///
    /// Models whose client cannot stream are left out of the streaming pool.
    /// Chat and streaming get separate strategy instances over the same handles.
    pub fn new(
        router_id: impl Into<String>,
        models: Vec<Arc<ModelHandle>>,
        strategy: RoutingStrategyKind,
        retry: ExpRetry,
    ) -> Self {
        let chat_stream_models: Vec<Arc<ModelHandle>> = models
            .iter()
            .filter(|model| model.supports_chat_stream())
            .cloned()
            .collect();

        let chat_models = Arc::new(models);
        let chat_stream_models = Arc::new(chat_stream_models);

        Self {
            telemetry: Telemetry {
                router_id: router_id.into(),
                metrics: None,
            },
            strategy,
            chat_routing: build_strategy(strategy, Arc::clone(&chat_models), LatencySource::Chat),
            chat_stream_routing: build_strategy(
                strategy,
                Arc::clone(&chat_stream_models),
                LatencySource::ChatStream,
            ),
            chat_models,
            chat_stream_models,
            retry,
        }
    }

    pub fn from_config(config: &RouterConfig, models: Vec<Arc<ModelHandle>>) -> Self {
        Self::new(
            config.id.clone(),
            models,
            config.strategy,
            ExpRetry::from_config(&config.retry),
        )
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Option<Arc<RoutingMetrics>>) -> Self {
        self.telemetry.metrics = metrics;
        self
    }

    pub fn id(&self) -> &str {
        &self.telemetry.router_id
    }

    pub fn strategy(&self) -> RoutingStrategyKind {
        self.strategy
    }

    pub fn chat_models(&self) -> &[Arc<ModelHandle>] {
        &self.chat_models
    }

    pub fn chat_stream_models(&self) -> &[Arc<ModelHandle>] {
        &self.chat_stream_models
    }

    /// Serve a chat request
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        if self.chat_models.is_empty() {
            return Err(Error::NoModelsConfigured(self.id().to_string()));
        }

        let mut models = self.chat_routing.iterator();
        let mut retry = self.retry.iterator();
        let mut first_pull = true;

        loop {
            match models.next() {
                Ok(model) => {
                    let started = Instant::now();

                    match model.chat(&request.params(model.id())).await {
                        Ok(mut response) => {
                            response.router_id = self.id().to_string();
                            self.telemetry.success(&model, RequestKind::Chat, started);

                            debug!(
                                router = self.id(),
                                model = model.id(),
                                attempts = retry.attempt() + 1,
                                "Chat request served"
                            );
                            return Ok(response);
                        }
                        Err(err) => {
                            self.telemetry
                                .failure(&model, RequestKind::Chat, &err, started);
                            if retry.has_next() {
                                self.telemetry.failover(&model, RequestKind::Chat);
                            }
                        }
                    }
                }
                Err(StrategyError::NoHealthyModels) if first_pull => {
                    self.telemetry
                        .exhausted(RequestKind::Chat, ErrorCode::NoHealthyModels);
                    return Err(Error::NoHealthyModels);
                }
                Err(StrategyError::NoHealthyModels) => {
                    debug!(router = self.id(), "No healthy models, waiting for recovery");
                }
            }

            first_pull = false;

            if !retry.has_next() {
                self.telemetry
                    .exhausted(RequestKind::Chat, ErrorCode::AllModelsUnavailable);
                return Err(Error::AllModelsUnavailable {
                    router_id: self.id().to_string(),
                });
            }

            retry.wait_next().await;
        }
    }

    /// Serve a streaming chat request
    ///
    /// Must be called from within a Tokio runtime. The returned stream ends
    /// after the last chunk or after a terminal error event.
    pub fn chat_stream(&self, request: ChatStreamRequest) -> ChatStreamReceiver {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

        let task = StreamTask {
            telemetry: self.telemetry.clone(),
            has_models: !self.chat_stream_models.is_empty(),
            routing: Arc::clone(&self.chat_stream_routing),
            retry: self.retry.clone(),
            request,
            tx,
        };
        tokio::spawn(task.run());

        ReceiverStream::new(rx)
    }
}

enum StreamOutcome {
    Completed,
    Cancelled,
    Failed(Error),
}

/// State owned by the task forwarding one chat stream
///
/// The channel closes when the task returns and drops `tx`.
struct StreamTask {
    telemetry: Telemetry,
    has_models: bool,
    routing: Arc<dyn RoutingStrategy<ModelHandle>>,
    retry: ExpRetry,
    request: ChatStreamRequest,
    tx: mpsc::Sender<ChatStreamResult>,
}

impl StreamTask {
    async fn run(self) {
        if !self.has_models {
            let err = Error::NoModelsConfigured(self.telemetry.router_id.clone());
            self.send_terminal(&err).await;
            return;
        }

        let mut models = self.routing.iterator();
        let mut retry = self.retry.iterator();
        let mut first_pull = true;

        loop {
            match models.next() {
                Ok(model) => {
                    let started = Instant::now();

                    match self.forward(&model).await {
                        StreamOutcome::Completed => {
                            self.telemetry
                                .success(&model, RequestKind::ChatStream, started);
                            return;
                        }
                        StreamOutcome::Cancelled => {
                            info!(
                                router = %self.telemetry.router_id,
                                request_id = %self.request.id,
                                "Chat stream cancelled by the caller"
                            );
                            return;
                        }
                        StreamOutcome::Failed(err) => {
                            self.telemetry
                                .failure(&model, RequestKind::ChatStream, &err, started);
                            if retry.has_next() {
                                self.telemetry.failover(&model, RequestKind::ChatStream);
                            }

                            let event = self.error_event(ErrorCode::ModelUnavailable, &err, None);
                            if self.tx.send(Err(event)).await.is_err() {
                                return;
                            }
                        }
                    }
                }
                Err(StrategyError::NoHealthyModels) if first_pull => {
                    self.send_terminal(&Error::NoHealthyModels).await;
                    return;
                }
                Err(StrategyError::NoHealthyModels) => {
                    debug!(
                        router = %self.telemetry.router_id,
                        "No healthy models, waiting for recovery"
                    );
                }
            }

            first_pull = false;

            if !retry.has_next() {
                let err = Error::AllModelsUnavailable {
                    router_id: self.telemetry.router_id.clone(),
                };
                self.send_terminal(&err).await;
                return;
            }

            tokio::select! {
                _ = retry.wait_next() => {}
                _ = self.tx.closed() => return,
            }
        }
    }

    /// Stream one model's response to the caller
    async fn forward(&self, model: &ModelHandle) -> StreamOutcome {
        let params = self.request.chat.params(model.id());

        let opened = tokio::select! {
            opened = model.chat_stream(&params) => opened,
            _ = self.tx.closed() => return StreamOutcome::Cancelled,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(err) => return StreamOutcome::Failed(err),
        };

        loop {
            let item = tokio::select! {
                item = stream.recv() => item,
                _ = self.tx.closed() => return StreamOutcome::Cancelled,
            };

            match item {
                None => return StreamOutcome::Completed,
                Some(Ok(mut chunk)) => {
                    chunk.id = self.request.id.clone();
                    chunk.router_id = self.telemetry.router_id.clone();
                    chunk.metadata = self.request.metadata.clone();

                    self.telemetry.chunk(model);
                    if self.tx.send(Ok(chunk)).await.is_err() {
                        return StreamOutcome::Cancelled;
                    }
                }
                Some(Err(err)) => return StreamOutcome::Failed(err),
            }
        }
    }

    async fn send_terminal(&self, err: &Error) {
        let code = err.code();
        self.telemetry.exhausted(RequestKind::ChatStream, code);

        let event = self.error_event(code, err, Some(FinishReason::Error));
        // The caller may already be gone
        let _ = self.tx.send(Err(event)).await;
    }

    fn error_event(
        &self,
        code: ErrorCode,
        err: &Error,
        finish_reason: Option<FinishReason>,
    ) -> ChatStreamError {
        ChatStreamError {
            id: self.request.id.clone(),
            router_id: self.telemetry.router_id.clone(),
            code,
            message: err.to_string(),
            metadata: self.request.metadata.clone(),
            finish_reason,
        }
    }
}
