//! Failure logging.
//!
//! One record per handled failure. Severity depends on the category:
//! validation failures are warnings, HTTP failures are warnings below 500
//! and errors from 500 up, internal failures are always errors and carry
//! the captured backtrace as a separate field.

use axum::http::StatusCode;
use serde::Serialize;

use crate::http::error::{FieldError, InternalFailure};
use crate::http::request::RequestContext;
use crate::observability::logging::{serialize_record, timestamp_now};

/// Fields shared by every failure record.
#[derive(Debug, Clone, Serialize)]
pub struct FailureOrigin {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl FailureOrigin {
    fn new(ctx: &RequestContext) -> Self {
        Self {
            request_id: ctx.request_id.to_string(),
            method: ctx.method.to_string(),
            path: ctx.path.clone(),
            client_ip: ctx.client_ip.map(|ip| ip.to_string()),
            user_agent: ctx.user_agent.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationErrorRecord<'a> {
    pub event: &'static str,
    #[serde(flatten)]
    pub origin: FailureOrigin,
    pub errors: &'a [FieldError],
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HttpErrorRecord<'a> {
    pub event: &'static str,
    #[serde(flatten)]
    pub origin: FailureOrigin,
    pub status_code: u16,
    pub error_detail: &'a str,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InternalErrorRecord<'a> {
    pub event: &'static str,
    #[serde(flatten)]
    pub origin: FailureOrigin,
    pub error_type: &'a str,
    pub error_message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_location: Option<&'a str>,
    pub timestamp: String,
}

/// Formats and emits failure records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorLogger;

impl ErrorLogger {
    pub fn log_validation_error(&self, ctx: &RequestContext, errors: &[FieldError]) {
        let record = ValidationErrorRecord {
            event: "validation_error",
            origin: FailureOrigin::new(ctx),
            errors,
            timestamp: timestamp_now(),
        };
        tracing::warn!(
            target: "validation_errors",
            request_id = %ctx.request_id,
            "{}",
            serialize_record(&record)
        );
    }

    pub fn log_http_error(&self, ctx: &RequestContext, status: StatusCode, detail: &str) {
        let record = HttpErrorRecord {
            event: "http_error",
            origin: FailureOrigin::new(ctx),
            status_code: status.as_u16(),
            error_detail: detail,
            timestamp: timestamp_now(),
        };
        let line = serialize_record(&record);
        if status.is_server_error() {
            tracing::error!(target: "http_errors", request_id = %ctx.request_id, "{}", line);
        } else {
            tracing::warn!(target: "http_errors", request_id = %ctx.request_id, "{}", line);
        }
    }

    pub fn log_internal_error(&self, ctx: &RequestContext, failure: &InternalFailure) {
        let record = InternalErrorRecord {
            event: "internal_error",
            origin: FailureOrigin::new(ctx),
            error_type: &failure.type_name,
            error_message: &failure.message,
            error_location: failure.location.as_deref(),
            timestamp: timestamp_now(),
        };
        tracing::error!(
            target: "internal_errors",
            request_id = %ctx.request_id,
            backtrace = %failure.backtrace(),
            "{}",
            serialize_record(&record)
        );
    }
}
