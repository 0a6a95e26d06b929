//! Request identity and context.
//!
//! # Responsibilities
//! - Generate the per-request correlation ID (UUID v4)
//! - Read it back from request headers further down the stack
//! - Capture the request attributes that log records need
//!
//! # Design Decisions
//! - The ID is generated as early as possible, before any handler runs
//! - Context is captured once and shared by reference; it is never mutated

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::extract::{ConnectInfo, Request};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};

/// Header carrying the correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Placeholder used when no correlation ID reached the component.
pub const UNKNOWN_REQUEST_ID: &str = "unknown";

/// Correlation identifier for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh random ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The sentinel ID.
    pub fn unknown() -> Self {
        Self(UNKNOWN_REQUEST_ID.to_string())
    }

    /// Read the ID from `x-request-id`, falling back to the sentinel.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(|s| Self(s.to_string()))
            .unwrap_or_else(Self::unknown)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Header representation, if the ID is a valid header value.
    pub fn header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.0).ok()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attributes of an inbound request captured for logging.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub method: Method,
    /// Absolute URL as seen by the server.
    pub url: String,
    pub path: String,
    pub client_ip: Option<IpAddr>,
    pub user_agent: Option<String>,
    /// Seconds since the Unix epoch at capture time.
    pub start_time: f64,
    started_at: Instant,
}

impl RequestContext {
    /// Capture the context of `request` under the given correlation ID.
    pub fn capture(request: &Request, request_id: RequestId) -> Self {
        let headers = request.headers();
        let uri = request.uri();

        let url = match (uri.scheme_str(), headers.get(header::HOST).and_then(|h| h.to_str().ok())) {
            (Some(_), _) => uri.to_string(),
            (None, Some(host)) => format!(
                "http://{}{}",
                host,
                uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
            ),
            (None, None) => uri.to_string(),
        };

        let client_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let start_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();

        Self {
            request_id,
            method: request.method().clone(),
            url,
            path: uri.path().to_string(),
            client_ip,
            user_agent,
            start_time,
            started_at: Instant::now(),
        }
    }

    /// Capture the context using whatever ID the request headers carry.
    pub fn from_request(request: &Request) -> Self {
        let request_id = RequestId::from_headers(request.headers());
        Self::capture(request, request_id)
    }

    /// Time since the context was captured.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Whether the request is an ordinary request/response exchange.
///
/// WebSocket handshakes and `CONNECT` tunnels are not. Any other `Upgrade`
/// header is ignored and the request is treated as plain HTTP.
pub fn is_plain_http(request: &Request) -> bool {
    request.method() != Method::CONNECT && !is_websocket_upgrade(request.headers())
}

fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    let upgrade_is_websocket = headers
        .get_all(header::UPGRADE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|p| p.trim().eq_ignore_ascii_case("websocket"));
    let connection_upgrades = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|t| t.trim().eq_ignore_ascii_case("upgrade"));
    upgrade_is_websocket && connection_upgrades
}
