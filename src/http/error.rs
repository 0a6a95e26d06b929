//! Failure taxonomy and the client-facing error envelope.
//!
//! Every failure a handler can produce is an [`AppError`]. The variants are
//! ordered from most to least specific; the failure layer dispatches on them
//! with a single `match`.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, Once};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::http::request::UNKNOWN_REQUEST_ID;

/// Message returned for every internal failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred";

/// Message returned for every validation failure.
pub const VALIDATION_ERROR_MESSAGE: &str = "Request validation failed";

/// A request failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    /// The request body did not match the expected schema.
    #[error("request validation failed with {} error(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// A deliberately raised HTTP-level failure.
    #[error("{status}: {detail}")]
    Http { status: StatusCode, detail: String },

    /// Anything else. Details are for the server log only.
    #[error("internal error: {0}")]
    Internal(InternalFailure),
}

impl AppError {
    pub fn validation(details: Vec<FieldError>) -> Self {
        Self::Validation(details)
    }

    pub fn http(status: StatusCode, detail: impl Into<String>) -> Self {
        Self::Http {
            status,
            detail: detail.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::http(StatusCode::NOT_FOUND, "Not Found")
    }

    pub fn method_not_allowed() -> Self {
        Self::http(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    }

    /// Wrap an arbitrary error as an internal failure.
    pub fn internal<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal(InternalFailure::new(
            short_type_name(std::any::type_name::<E>()),
            error.to_string(),
        ))
    }

    /// Convert a caught panic payload into an internal failure.
    ///
    /// When [`install_panic_hook`] is active, the location and backtrace are
    /// the ones recorded at the panic point on this thread.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with non-string payload".to_string()
        };
        let failure = match take_panic_site() {
            Some(site) => InternalFailure {
                type_name: "panic".to_string(),
                message,
                location: site.location,
                backtrace: Arc::new(site.backtrace),
            },
            None => InternalFailure::new("panic", message),
        };
        Self::Internal(failure)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Http { status, .. } => *status,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing envelope for this failure.
    pub fn envelope(&self, request_id: &str) -> ErrorEnvelope {
        let request_id = request_id.to_string();
        match self {
            AppError::Validation(details) => ErrorEnvelope::ValidationError {
                message: VALIDATION_ERROR_MESSAGE.to_string(),
                details: details.clone(),
                request_id,
            },
            AppError::Http { detail, .. } => ErrorEnvelope::HttpError {
                message: detail.clone(),
                request_id,
            },
            AppError::Internal(_) => ErrorEnvelope::InternalError {
                message: INTERNAL_ERROR_MESSAGE.to_string(),
                request_id,
            },
        }
    }

    /// Render the envelope for the given correlation ID.
    pub fn render(&self, request_id: &str) -> Response {
        (self.status(), Json(self.envelope(request_id))).into_response()
    }
}

/// Rendered with the sentinel ID; the failure itself rides along in the
/// response extensions so the failure layer can log it and re-render it
/// with the real correlation ID.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = self.render(UNKNOWN_REQUEST_ID);
        response.extensions_mut().insert(self);
        response
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::internal(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::internal(err)
    }
}

/// Diagnostic capture of an unhandled failure.
#[derive(Debug, Clone)]
pub struct InternalFailure {
    pub type_name: String,
    pub message: String,
    /// `file:line:column` of the panic, when the failure was one.
    pub location: Option<String>,
    backtrace: Arc<Backtrace>,
}

impl InternalFailure {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            location: None,
            backtrace: Arc::new(Backtrace::force_capture()),
        }
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for InternalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " at {}", location)?;
        }
        Ok(())
    }
}

struct PanicSite {
    location: Option<String>,
    backtrace: Backtrace,
}

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

/// Record the location and stack of every panic for [`AppError::from_panic`].
///
/// Installed once per process; the previously installed hook still runs.
pub fn install_panic_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let site = PanicSite {
                location: info.location().map(ToString::to_string),
                backtrace: Backtrace::force_capture(),
            };
            let _ = LAST_PANIC.try_with(|slot| {
                if let Ok(mut slot) = slot.try_borrow_mut() {
                    *slot = Some(site);
                }
            });
            previous(info);
        }));
    });
}

fn take_panic_site() -> Option<PanicSite> {
    LAST_PANIC
        .try_with(|slot| slot.try_borrow_mut().ok().and_then(|mut s| s.take()))
        .ok()
        .flatten()
}

fn short_type_name(full: &str) -> String {
    // "std::io::error::Error" -> "Error"; generic arguments are kept as-is.
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => full[idx + 2..].to_string(),
        None => full.to_string(),
    }
}

/// Marker placed on responses rendered from an internal failure.
#[derive(Debug, Clone, Copy)]
pub struct UnhandledFailure;

/// One segment of a field location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for LocSegment {
    fn from(key: &str) -> Self {
        LocSegment::Key(key.to_string())
    }
}

impl From<String> for LocSegment {
    fn from(key: String) -> Self {
        LocSegment::Key(key)
    }
}

impl From<usize> for LocSegment {
    fn from(index: usize) -> Self {
        LocSegment::Index(index)
    }
}

/// A single validation problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// Machine-readable error kind, e.g. `missing` or `int_parsing`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Path to the offending value.
    pub loc: Vec<LocSegment>,
    /// Human-readable message.
    pub msg: String,
    /// The offending input, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    /// Extra context such as the parser's own message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctx: Option<serde_json::Value>,
}

impl FieldError {
    pub fn new(kind: impl Into<String>, loc: Vec<LocSegment>, msg: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            loc,
            msg: msg.into(),
            input: None,
            ctx: None,
        }
    }

    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_ctx(mut self, ctx: serde_json::Value) -> Self {
        self.ctx = Some(ctx);
        self
    }
}

/// JSON body returned to clients on failure, discriminated by `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ErrorEnvelope {
    ValidationError {
        message: String,
        details: Vec<FieldError>,
        request_id: String,
    },
    HttpError {
        message: String,
        request_id: String,
    },
    InternalError {
        message: String,
        request_id: String,
    },
}

impl ErrorEnvelope {
    pub fn request_id(&self) -> &str {
        match self {
            ErrorEnvelope::ValidationError { request_id, .. }
            | ErrorEnvelope::HttpError { request_id, .. }
            | ErrorEnvelope::InternalError { request_id, .. } => request_id,
        }
    }
}
