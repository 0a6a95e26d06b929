//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): responses by method and status
//! - `http_request_duration_seconds` (histogram): time to response head
//! - `http_requests_in_flight` (gauge): requests whose body is still open
//! - `http_failures_total` (counter): handled failures by kind
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - No path label, to keep cardinality bounded

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::http::middleware::interceptor::{BodyOutcome, RequestInterceptor, ResponseHead};
use crate::http::request::RequestContext;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one handled failure.
pub fn record_failure(kind: &'static str) {
    metrics::counter!("http_failures_total", "kind" => kind).increment(1);
}

/// Interceptor feeding the request metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsInterceptor;

impl RequestInterceptor for MetricsInterceptor {
    fn on_request_start(&self, _ctx: &RequestContext) {
        metrics::gauge!("http_requests_in_flight").increment(1.0);
    }

    fn on_response_start(&self, ctx: &RequestContext, head: &ResponseHead) {
        let method = ctx.method.to_string();
        let status = head.status.as_u16().to_string();
        metrics::counter!(
            "http_requests_total",
            "method" => method.clone(),
            "status" => status.clone()
        )
        .increment(1);
        metrics::histogram!(
            "http_request_duration_seconds",
            "method" => method,
            "status" => status
        )
        .record(head.elapsed.as_secs_f64());
    }

    fn on_request_end(&self, _ctx: &RequestContext, _outcome: BodyOutcome, _elapsed: Duration) {
        metrics::gauge!("http_requests_in_flight").decrement(1.0);
    }
}
