//! Request lifecycle logging.
//!
//! Emits one `request_received` record when a request enters the stack and
//! one `request_completed` record when its response head is produced. Both
//! go to the `request_logger` target at info level.

use std::time::Duration;

use axum::http::StatusCode;
use serde::Serialize;

use crate::http::middleware::interceptor::{BodyOutcome, RequestInterceptor, ResponseHead};
use crate::http::request::RequestContext;
use crate::observability::logging::{duration_ms, serialize_record, timestamp_now};

/// Record emitted when a request arrives.
#[derive(Debug, Clone, Serialize)]
pub struct RequestLogRecord {
    pub event: &'static str,
    pub request_id: String,
    pub method: String,
    pub url: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: String,
    pub start_time: f64,
}

impl RequestLogRecord {
    pub fn new(ctx: &RequestContext) -> Self {
        Self {
            event: "request_received",
            request_id: ctx.request_id.to_string(),
            method: ctx.method.to_string(),
            url: ctx.url.clone(),
            client_ip: ctx.client_ip.map(|ip| ip.to_string()),
            user_agent: ctx.user_agent.clone(),
            timestamp: timestamp_now(),
            start_time: ctx.start_time,
        }
    }
}

/// Record emitted when the response head is ready.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseLogRecord {
    pub event: &'static str,
    pub request_id: String,
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub duration_ms: f64,
    pub timestamp: String,
}

impl ResponseLogRecord {
    pub fn new(ctx: &RequestContext, status: StatusCode, elapsed: Duration) -> Self {
        Self {
            event: "request_completed",
            request_id: ctx.request_id.to_string(),
            method: ctx.method.to_string(),
            url: ctx.url.clone(),
            status_code: status.as_u16(),
            duration_ms: duration_ms(elapsed),
            timestamp: timestamp_now(),
        }
    }
}

/// Formats and emits request lifecycle records.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredLogger;

impl StructuredLogger {
    pub fn log_request(&self, ctx: &RequestContext) {
        let record = RequestLogRecord::new(ctx);
        tracing::info!(
            target: "request_logger",
            request_id = %ctx.request_id,
            "{}",
            serialize_record(&record)
        );
    }

    pub fn log_response(&self, ctx: &RequestContext, status: StatusCode, elapsed: Duration) {
        let record = ResponseLogRecord::new(ctx, status, elapsed);
        tracing::info!(
            target: "request_logger",
            request_id = %ctx.request_id,
            "{}",
            serialize_record(&record)
        );
    }
}

/// Interceptor that writes the request lifecycle records.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor {
    logger: StructuredLogger,
}

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RequestInterceptor for LoggingInterceptor {
    fn on_request_start(&self, ctx: &RequestContext) {
        self.logger.log_request(ctx);
    }

    fn on_response_start(&self, ctx: &RequestContext, head: &ResponseHead) {
        // The internal-error record already describes this request.
        if head.unhandled_failure {
            return;
        }
        self.logger.log_response(ctx, head.status, head.elapsed);
    }

    fn on_request_end(&self, ctx: &RequestContext, outcome: BodyOutcome, elapsed: Duration) {
        tracing::debug!(
            target: "request_logger",
            request_id = %ctx.request_id,
            outcome = outcome.as_str(),
            total_ms = duration_ms(elapsed),
            "Response body finished"
        );
    }
}
