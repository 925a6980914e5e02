//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for Switchyard routers:
//! - Model call counts (total, success, failure by router, model and kind)
//! - Model call latency histograms
//! - Failover and exhaustion counters
//! - Model health and latency-estimate gauges
//! - Streaming chunk counts

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Kind of request served by a router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Chat,
    ChatStream,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Chat => "chat",
            RequestKind::ChatStream => "chat_stream",
        }
    }
}

/// Routing metrics collector
#[derive(Clone)]
pub struct RoutingMetrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    // Model call counters
    /// Total model calls
    pub model_calls_total: CounterVec,
    /// Successful model calls
    pub model_calls_success: CounterVec,
    /// Failed model calls
    pub model_calls_failure: CounterVec,

    /// Model call duration (time to response, or to stream completion)
    pub model_call_duration_seconds: HistogramVec,

    // Routing outcome counters
    /// Failovers to another candidate after a model failure
    pub failovers_total: CounterVec,
    /// Requests that ended without any model serving them
    pub requests_exhausted: CounterVec,

    // Model state gauges
    /// Model health (1=healthy, 0=unhealthy)
    pub model_healthy: GaugeVec,
    /// Latency estimate per output token, in seconds (0 until warmed up)
    pub model_latency_seconds: GaugeVec,

    /// Chunks forwarded to stream consumers
    pub streaming_chunks_total: CounterVec,
}

impl RoutingMetrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let model_calls_total = CounterVec::new(
            Opts::new("switchyard_model_calls_total", "Total number of model calls"),
            &["router", "model", "kind"],
        )?;

        let model_calls_success = CounterVec::new(
            Opts::new(
                "switchyard_model_calls_success_total",
                "Total number of successful model calls",
            ),
            &["router", "model", "kind"],
        )?;

        let model_calls_failure = CounterVec::new(
            Opts::new(
                "switchyard_model_calls_failure_total",
                "Total number of failed model calls",
            ),
            &["router", "model", "kind", "error_code"],
        )?;

        let model_call_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "switchyard_model_call_duration_seconds",
                "Model call duration in seconds",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["router", "model", "kind"],
        )?;

        let failovers_total = CounterVec::new(
            Opts::new(
                "switchyard_failovers_total",
                "Number of times a request moved on after a model failure",
            ),
            &["router", "from_model", "kind"],
        )?;

        let requests_exhausted = CounterVec::new(
            Opts::new(
                "switchyard_requests_exhausted_total",
                "Requests that no model could serve",
            ),
            &["router", "kind", "error_code"],
        )?;

        let model_healthy = GaugeVec::new(
            Opts::new(
                "switchyard_model_healthy",
                "Model health status (1=healthy, 0=unhealthy)",
            ),
            &["router", "model"],
        )?;

        let model_latency_seconds = GaugeVec::new(
            Opts::new(
                "switchyard_model_latency_seconds",
                "Moving average of model latency per output token",
            ),
            &["router", "model", "kind"],
        )?;

        let streaming_chunks_total = CounterVec::new(
            Opts::new(
                "switchyard_streaming_chunks_total",
                "Chunks forwarded to streaming clients",
            ),
            &["router", "model"],
        )?;

        registry.register(Box::new(model_calls_total.clone()))?;
        registry.register(Box::new(model_calls_success.clone()))?;
        registry.register(Box::new(model_calls_failure.clone()))?;
        registry.register(Box::new(model_call_duration_seconds.clone()))?;
        registry.register(Box::new(failovers_total.clone()))?;
        registry.register(Box::new(requests_exhausted.clone()))?;
        registry.register(Box::new(model_healthy.clone()))?;
        registry.register(Box::new(model_latency_seconds.clone()))?;
        registry.register(Box::new(streaming_chunks_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            model_calls_total,
            model_calls_success,
            model_calls_failure,
            model_call_duration_seconds,
            failovers_total,
            requests_exhausted,
            model_healthy,
            model_latency_seconds,
            streaming_chunks_total,
        })
    }

    /// Get the Prometheus registry for exporting metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode all metrics in the Prometheus text exposition format
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Record a successful model call
    pub fn record_model_success(
        &self,
        router: &str,
        model: &str,
        kind: RequestKind,
        duration_secs: f64,
    ) {
        let labels = [router, model, kind.as_str()];
        self.model_calls_total.with_label_values(&labels).inc();
        self.model_calls_success.with_label_values(&labels).inc();
        self.model_call_duration_seconds
            .with_label_values(&labels)
            .observe(duration_secs);
    }

    /// Record a failed model call
    pub fn record_model_failure(
        &self,
        router: &str,
        model: &str,
        kind: RequestKind,
        error_code: &str,
        duration_secs: f64,
    ) {
        self.model_calls_total
            .with_label_values(&[router, model, kind.as_str()])
            .inc();
        self.model_calls_failure
            .with_label_values(&[router, model, kind.as_str(), error_code])
            .inc();
        self.model_call_duration_seconds
            .with_label_values(&[router, model, kind.as_str()])
            .observe(duration_secs);
    }

    /// Record a failover away from `from_model`
    pub fn record_failover(&self, router: &str, from_model: &str, kind: RequestKind) {
        self.failovers_total
            .with_label_values(&[router, from_model, kind.as_str()])
            .inc();
    }

    /// Record a request no model could serve
    pub fn record_exhausted(&self, router: &str, kind: RequestKind, error_code: &str) {
        self.requests_exhausted
            .with_label_values(&[router, kind.as_str(), error_code])
            .inc();
    }

    /// Update model health and latency gauges
    pub fn update_model_state(
        &self,
        router: &str,
        model: &str,
        healthy: bool,
        chat_latency_secs: f64,
        stream_latency_secs: f64,
    ) {
        self.model_healthy
            .with_label_values(&[router, model])
            .set(if healthy { 1.0 } else { 0.0 });
        self.model_latency_seconds
            .with_label_values(&[router, model, RequestKind::Chat.as_str()])
            .set(chat_latency_secs);
        self.model_latency_seconds
            .with_label_values(&[router, model, RequestKind::ChatStream.as_str()])
            .set(stream_latency_secs);
    }

    /// Record a chunk forwarded to a stream consumer
    pub fn record_stream_chunk(&self, router: &str, model: &str) {
        self.streaming_chunks_total
            .with_label_values(&[router, model])
            .inc();
    }
}
