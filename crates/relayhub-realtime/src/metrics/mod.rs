//! Prometheus metrics for the gateway.
//!
//! All collectors live in a registry owned by [`GatewayMetrics`], so
//! several instances (one per test, say) never collide.

use std::time::Duration;

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    IntGaugeVec, Opts, Registry, TextEncoder,
};

use relayhub_core::error::AppError;
use relayhub_core::result::AppResult;

/// `Content-Type` of [`GatewayMetrics::encode`] output.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Histogram buckets for delivered payload sizes, in bytes.
const MESSAGE_SIZE_BUCKETS: [f64; 6] = [64.0, 256.0, 1024.0, 4096.0, 16384.0, 65536.0];

/// Error categories recorded under `websocket_errors_total{type}`.
pub mod error_type {
    pub const BACKPRESSURE: &str = "backpressure";
    pub const DISPLACED: &str = "displaced";
    pub const AUTH: &str = "auth";
    pub const UPGRADE: &str = "upgrade";
    pub const WRITE: &str = "write";
    pub const READ_TIMEOUT: &str = "read_timeout";
}

/// Every collector the gateway exports.
#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Registry,
    active_connections: IntGaugeVec,
    connections_total: IntCounterVec,
    messages_sent: IntCounterVec,
    connection_duration: HistogramVec,
    message_size: HistogramVec,
    errors: IntCounterVec,
    request_duration: HistogramVec,
}

impl std::fmt::Debug for GatewayMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayMetrics").finish()
    }
}

impl GatewayMetrics {
    /// Creates and registers all collectors in a fresh registry.
    pub fn new() -> AppResult<Self> {
        let registry = Registry::new();

        let active_connections = IntGaugeVec::new(
            Opts::new(
                "websocket_active_connections",
                "Number of currently admitted WebSocket connections",
            ),
            &["hub"],
        )
        .map_err(metric_error)?;
        let connections_total = IntCounterVec::new(
            Opts::new(
                "websocket_connections_total",
                "Total number of WebSocket connections admitted",
            ),
            &["hub"],
        )
        .map_err(metric_error)?;
        let messages_sent = IntCounterVec::new(
            Opts::new(
                "websocket_messages_sent_total",
                "Total number of frames enqueued for delivery",
            ),
            &["hub"],
        )
        .map_err(metric_error)?;
        let connection_duration = HistogramVec::new(
            HistogramOpts::new(
                "websocket_connection_duration_seconds",
                "Time between admission and unregistration",
            ),
            &["hub"],
        )
        .map_err(metric_error)?;
        let message_size = HistogramVec::new(
            HistogramOpts::new(
                "websocket_message_size_bytes",
                "Size of payloads enqueued for delivery",
            )
            .buckets(MESSAGE_SIZE_BUCKETS.to_vec()),
            &["hub"],
        )
        .map_err(metric_error)?;
        let errors = IntCounterVec::new(
            Opts::new("websocket_errors_total", "WebSocket errors by category"),
            &["hub", "type"],
        )
        .map_err(metric_error)?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "api_request_duration_milliseconds",
                "HTTP request latency in milliseconds",
            )
            .buckets(vec![
                1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0,
            ]),
            &["method", "endpoint"],
        )
        .map_err(metric_error)?;

        registry
            .register(Box::new(active_connections.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(connections_total.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(messages_sent.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(connection_duration.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(message_size.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(errors.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(request_duration.clone()))
            .map_err(metric_error)?;

        Ok(Self {
            registry,
            active_connections,
            connections_total,
            messages_sent,
            connection_duration,
            message_size,
            errors,
            request_duration,
        })
    }

    /// Collectors bound to one hub's label.
    pub fn for_hub(&self, hub: &str) -> HubMetrics {
        HubMetrics {
            hub: hub.to_string(),
            active: self.active_connections.with_label_values(&[hub]),
            total: self.connections_total.with_label_values(&[hub]),
            sent: self.messages_sent.with_label_values(&[hub]),
            duration: self.connection_duration.with_label_values(&[hub]),
            size: self.message_size.with_label_values(&[hub]),
            errors: self.errors.clone(),
        }
    }

    /// Record one HTTP request's latency.
    pub fn observe_request(&self, method: &str, endpoint: &str, elapsed: Duration) {
        self.request_duration
            .with_label_values(&[method, endpoint])
            .observe(elapsed.as_secs_f64() * 1000.0);
    }

    /// Render every collector in the text exposition format.
    pub fn encode(&self) -> AppResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metric_error)?;
        String::from_utf8(buffer)
            .map_err(|e| AppError::internal(format!("Metrics output is not UTF-8: {e}")))
    }
}

fn metric_error(err: prometheus::Error) -> AppError {
    AppError::internal(format!("Metrics error: {err}"))
}

/// One hub's slice of the gateway metrics.
#[derive(Clone)]
pub struct HubMetrics {
    hub: String,
    active: IntGauge,
    total: IntCounter,
    sent: IntCounter,
    duration: Histogram,
    size: Histogram,
    errors: IntCounterVec,
}

impl std::fmt::Debug for HubMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubMetrics")
            .field("hub", &self.hub)
            .field("active", &self.active.get())
            .finish()
    }
}

impl HubMetrics {
    /// A connection was admitted.
    pub fn connection_opened(&self) {
        self.total.inc();
        self.active.inc();
    }

    /// `count` admitted connections left the hub.
    pub fn connections_closed(&self, count: usize) {
        self.active.sub(count as i64);
    }

    /// Lifetime of a connection that left through unregistration.
    pub fn observe_duration(&self, lifetime: Duration) {
        self.duration.observe(lifetime.as_secs_f64());
    }

    /// A frame of `size` bytes was enqueued for one recipient.
    pub fn message_sent(&self, size: usize) {
        self.sent.inc();
        self.size.observe(size as f64);
    }

    /// A frame of `size` bytes was enqueued for `recipients` connections.
    pub fn broadcast_sent(&self, size: usize, recipients: usize) {
        if recipients == 0 {
            return;
        }
        self.sent.inc_by(recipients as u64);
        self.size.observe(size as f64);
    }

    pub fn error(&self, kind: &str) {
        self.errors.with_label_values(&[self.hub.as_str(), kind]).inc();
    }

    pub fn active(&self) -> i64 {
        self.active.get()
    }

    pub fn total(&self) -> u64 {
        self.total.get()
    }

    pub fn sent(&self) -> u64 {
        self.sent.get()
    }

    pub fn errors(&self, kind: &str) -> u64 {
        self.errors.with_label_values(&[self.hub.as_str(), kind]).get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_counters_share_the_registry() {
        let metrics = GatewayMetrics::new().unwrap();
        let main = metrics.for_hub("main");
        main.connection_opened();
        main.connection_opened();
        main.connections_closed(1);
        main.message_sent(300);
        main.error(error_type::BACKPRESSURE);

        let again = metrics.for_hub("main");
        assert_eq!(again.active(), 1);
        assert_eq!(again.total(), 2);
        assert_eq!(again.sent(), 1);
        assert_eq!(again.errors(error_type::BACKPRESSURE), 1);

        let other = metrics.for_hub("chat");
        assert_eq!(other.active(), 0);
    }

    #[test]
    fn broadcast_counts_each_recipient() {
        let metrics = GatewayMetrics::new().unwrap();
        let hub = metrics.for_hub("main");
        hub.broadcast_sent(10, 3);
        hub.broadcast_sent(10, 0);
        assert_eq!(hub.sent(), 3);
    }

    #[test]
    fn exposition_names_every_family() {
        let metrics = GatewayMetrics::new().unwrap();
        let hub = metrics.for_hub("main");
        hub.connection_opened();
        hub.observe_duration(Duration::from_millis(1500));
        hub.message_sent(10);
        hub.error(error_type::AUTH);
        metrics.observe_request("GET", "/ping", Duration::from_millis(3));

        let text = metrics.encode().unwrap();
        for family in [
            "websocket_active_connections",
            "websocket_connections_total",
            "websocket_messages_sent_total",
            "websocket_connection_duration_seconds",
            "websocket_message_size_bytes",
            "websocket_errors_total",
            "api_request_duration_milliseconds",
        ] {
            assert!(text.contains(family), "missing {family}");
        }
        assert!(text.contains(r#"websocket_active_connections{hub="main"} 1"#));
    }

    #[test]
    fn separate_instances_do_not_collide() {
        let first = GatewayMetrics::new().unwrap();
        let second = GatewayMetrics::new().unwrap();
        first.for_hub("main").connection_opened();
        assert_eq!(second.for_hub("main").active(), 0);
    }
}
