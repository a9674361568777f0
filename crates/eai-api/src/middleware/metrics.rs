//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Issuance counters are pushed by the credential handlers.
//! Registry gauges (`early_adopters`, `events`) are refreshed on each
//! `/metrics` scrape.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    core::Collector, Encoder, Gauge, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    credentials_prepared_total: IntCounterVec,
    credentials_issued_total: IntCounterVec,

    early_adopters: Gauge,
    events: Gauge,
    issuer_configured: Gauge,
    issuer_key_ephemeral: Gauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

fn register<C: Collector + Clone + 'static>(registry: &Registry, collector: C) -> C {
    registry
        .register(Box::new(collector.clone()))
        .expect("metric can be registered");
    collector
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("eai_http_requests_total", "Total HTTP requests"),
                &["method", "path", "status"],
            )
            .expect("metric can be created"),
        );
        let http_request_duration_seconds = register(
            &registry,
            HistogramVec::new(
                HistogramOpts::new(
                    "eai_http_request_duration_seconds",
                    "HTTP request duration in seconds",
                )
                .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
                &["method", "path"],
            )
            .expect("metric can be created"),
        );
        let http_errors_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("eai_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
                &["method", "path", "status"],
            )
            .expect("metric can be created"),
        );
        let credentials_prepared_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new(
                    "eai_credentials_prepared_total",
                    "Successful prepare_credential calls",
                ),
                &["credential_type"],
            )
            .expect("metric can be created"),
        );
        let credentials_issued_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new(
                    "eai_credentials_issued_total",
                    "Credentials returned by get_credential",
                ),
                &["credential_type"],
            )
            .expect("metric can be created"),
        );
        let early_adopters = register(
            &registry,
            Gauge::new("early_adopters", "Registered participants").expect("metric can be created"),
        );
        let events = register(
            &registry,
            Gauge::new("events", "Registered events").expect("metric can be created"),
        );
        let issuer_configured = register(
            &registry,
            Gauge::new(
                "eai_issuer_configured",
                "Whether the issuer configuration is set (1=configured)",
            )
            .expect("metric can be created"),
        );
        let issuer_key_ephemeral = register(
            &registry,
            Gauge::new(
                "eai_issuer_key_ephemeral",
                "Whether the credential signing key is ephemeral (1=ephemeral, 0=real)",
            )
            .expect("metric can be created"),
        );

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                credentials_prepared_total,
                credentials_issued_total,
                early_adopters,
                events,
                issuer_configured,
                issuer_key_ephemeral,
            }),
        }
    }

    /// Total request count across all labels.
    pub fn requests(&self) -> u64 {
        sum_counter(&self.inner.http_requests_total)
    }

    /// Total error count across all labels.
    pub fn errors(&self) -> u64 {
        sum_counter(&self.inner.http_errors_total)
    }

    /// Total prepared credentials across all types.
    pub fn prepared(&self) -> u64 {
        sum_counter(&self.inner.credentials_prepared_total)
    }

    /// Total issued credentials across all types.
    pub fn issued(&self) -> u64 {
        sum_counter(&self.inner.credentials_issued_total)
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    /// Count a successful prepare.
    pub fn record_prepared(&self, credential_type: &str) {
        self.inner
            .credentials_prepared_total
            .with_label_values(&[credential_type])
            .inc();
    }

    /// Count an issued credential.
    pub fn record_issued(&self, credential_type: &str) {
        self.inner
            .credentials_issued_total
            .with_label_values(&[credential_type])
            .inc();
    }

    /// Refresh the scrape-time gauges.
    pub fn set_registry_gauges(&self, participants: usize, events: usize) {
        self.inner.early_adopters.set(participants as f64);
        self.inner.events.set(events as f64);
    }

    /// Refresh the issuer status gauges.
    pub fn set_issuer_gauges(&self, configured: bool, key_ephemeral: bool) {
        self.inner
            .issuer_configured
            .set(if configured { 1.0 } else { 0.0 });
        self.inner
            .issuer_key_ephemeral
            .set(if key_ephemeral { 1.0 } else { 0.0 });
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn sum_counter(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Middleware that records HTTP request metrics.
///
/// Labels use the matched route template so unknown paths collapse into
/// a single `unmatched` series.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record_request(
            &method,
            &path,
            response.status().as_u16(),
            start.elapsed().as_secs_f64(),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let m = ApiMetrics::new();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
        assert_eq!(m.prepared(), 0);
        assert_eq!(m.issued(), 0);
    }

    #[test]
    fn errors_counted_separately() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/v1/events", 200, 0.01);
        m.record_request("POST", "/v1/credentials/get", 404, 0.01);
        m.record_request("POST", "/v1/credentials/get", 500, 0.01);
        assert_eq!(m.requests(), 3);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn issuance_counters_by_type() {
        let m = ApiMetrics::new();
        m.record_prepared("EarlyAdopter");
        m.record_prepared("EventAttendance");
        m.record_issued("EarlyAdopter");
        assert_eq!(m.prepared(), 2);
        assert_eq!(m.issued(), 1);
    }

    #[test]
    fn encodes_gauges() {
        let m = ApiMetrics::new();
        m.set_registry_gauges(3, 2);
        m.set_issuer_gauges(true, false);
        let text = m.gather_and_encode().unwrap();
        assert!(text.contains("early_adopters 3"));
        assert!(text.contains("events 2"));
        assert!(text.contains("eai_issuer_configured 1"));
    }

    #[test]
    fn clones_share_registry() {
        let m = ApiMetrics::new();
        let c = m.clone();
        c.record_request("GET", "/metrics", 200, 0.001);
        assert_eq!(m.requests(), 1);
    }
}
