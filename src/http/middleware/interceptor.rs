//! Request interceptors.
//!
//! An interceptor observes a request at three points:
//!
//! ```text
//! on_request_start   request entered the stack, correlation ID assigned
//! on_response_start  inner service produced the response head
//! on_request_end     response body finished streaming, or was dropped
//! ```
//!
//! Interceptors only observe. They cannot alter the request or response and
//! a panicking hook is contained and reported, never propagated.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use http_body::{Body as HttpBody, Frame, SizeHint};

use crate::http::error::UnhandledFailure;
use crate::http::request::{is_plain_http, RequestContext, RequestId, X_REQUEST_ID};

/// What the interceptor sees of a response when its head is produced.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    /// Time since the request entered the stack.
    pub elapsed: Duration,
    /// The response was rendered from an unhandled failure.
    pub unhandled_failure: bool,
}

/// How the response body ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyOutcome {
    Completed,
    Aborted,
}

impl BodyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyOutcome::Completed => "completed",
            BodyOutcome::Aborted => "aborted",
        }
    }
}

/// Lifecycle hooks for every plain HTTP request.
pub trait RequestInterceptor: Send + Sync + 'static {
    fn on_request_start(&self, ctx: &RequestContext);

    fn on_response_start(&self, ctx: &RequestContext, head: &ResponseHead);

    fn on_request_end(&self, _ctx: &RequestContext, _outcome: BodyOutcome, _elapsed: Duration) {}
}

/// Ordered set of interceptors, invoked first to last at every hook.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, interceptor: impl RequestInterceptor) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    fn each(&self, hook: &'static str, f: impl Fn(&dyn RequestInterceptor)) {
        for interceptor in &self.interceptors {
            if catch_unwind(AssertUnwindSafe(|| f(interceptor.as_ref()))).is_err() {
                tracing::warn!(hook, "Request interceptor panicked; continuing");
            }
        }
    }

    pub fn request_start(&self, ctx: &RequestContext) {
        self.each("on_request_start", |i| i.on_request_start(ctx));
    }

    pub fn response_start(&self, ctx: &RequestContext, head: &ResponseHead) {
        self.each("on_response_start", |i| i.on_response_start(ctx, head));
    }

    pub fn request_end(&self, ctx: &RequestContext, outcome: BodyOutcome, elapsed: Duration) {
        self.each("on_request_end", |i| i.on_request_end(ctx, outcome, elapsed));
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("len", &self.interceptors.len())
            .finish()
    }
}

/// Middleware running the chain around the rest of the stack.
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn intercept(
    State(chain): State<Arc<InterceptorChain>>,
    mut request: Request,
    next: Next,
) -> Response {
    if !is_plain_http(&request) {
        return next.run(request).await;
    }

    let request_id = RequestId::generate();
    if let Some(value) = request_id.header_value() {
        request.headers_mut().insert(X_REQUEST_ID, value);
    }
    request.extensions_mut().insert(request_id.clone());

    let ctx = Arc::new(RequestContext::capture(&request, request_id));
    chain.request_start(&ctx);

    // Reports `Aborted` if this future is dropped before the body finishes.
    let completion = Completion::new(chain, ctx);

    let response = next.run(request).await;

    let head = ResponseHead {
        status: response.status(),
        elapsed: completion.ctx.elapsed(),
        unhandled_failure: response.extensions().get::<UnhandledFailure>().is_some(),
    };
    completion.chain.response_start(&completion.ctx, &head);

    let (parts, body) = response.into_parts();
    let body = ObservedBody {
        inner: body,
        completion,
    };
    Response::from_parts(parts, Body::new(body))
}

/// Fires `on_request_end` exactly once, with `Aborted` if dropped unfired.
struct Completion {
    chain: Arc<InterceptorChain>,
    ctx: Arc<RequestContext>,
    fired: bool,
}

impl Completion {
    fn new(chain: Arc<InterceptorChain>, ctx: Arc<RequestContext>) -> Self {
        Self {
            chain,
            ctx,
            fired: false,
        }
    }

    fn fire(&mut self, outcome: BodyOutcome) {
        if !self.fired {
            self.fired = true;
            self.chain.request_end(&self.ctx, outcome, self.ctx.elapsed());
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.fire(BodyOutcome::Aborted);
    }
}

/// Response body that reports when it has been fully sent or dropped.
struct ObservedBody {
    inner: Body,
    completion: Completion,
}

impl HttpBody for ObservedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(None) => this.completion.fire(BodyOutcome::Completed),
            Poll::Ready(Some(Err(_))) => this.completion.fire(BodyOutcome::Aborted),
            _ => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for ObservedBody {
    fn drop(&mut self) {
        // hyper may stop polling once `is_end_stream` reports true.
        if self.inner.is_end_stream() {
            self.completion.fire(BodyOutcome::Completed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    struct Recording(Arc<Recorder>);

    impl RequestInterceptor for Recording {
        fn on_request_start(&self, ctx: &RequestContext) {
            self.0.push(format!("start {} {}", ctx.method, ctx.path));
        }

        fn on_response_start(&self, _ctx: &RequestContext, head: &ResponseHead) {
            self.0.push(format!("response {}", head.status.as_u16()));
        }

        fn on_request_end(&self, _ctx: &RequestContext, outcome: BodyOutcome, _elapsed: Duration) {
            self.0.push(format!("end {}", outcome.as_str()));
        }
    }

    struct Panicking;

    impl RequestInterceptor for Panicking {
        fn on_request_start(&self, _ctx: &RequestContext) {
            panic!("sink unavailable");
        }

        fn on_response_start(&self, _ctx: &RequestContext, _head: &ResponseHead) {
            panic!("sink unavailable");
        }
    }

    fn app(chain: InterceptorChain) -> Router {
        Router::new()
            .route(
                "/echo-id",
                get(|req: Request| async move {
                    req.headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("none")
                        .to_string()
                }),
            )
            .layer(from_fn_with_state(Arc::new(chain), intercept))
    }

    #[tokio::test]
    async fn hooks_fire_in_order() {
        let recorder = Arc::new(Recorder::default());
        let app = app(InterceptorChain::new().with(Recording(recorder.clone())));

        let response = app
            .oneshot(Request::builder().uri("/echo-id").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.len(), 36);

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["start GET /echo-id", "response 200", "end completed"]
        );
    }

    #[tokio::test]
    async fn replaces_client_supplied_id() {
        let app = app(InterceptorChain::new());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/echo-id")
                    .header(X_REQUEST_ID, "client-chosen")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let id = String::from_utf8(body.to_vec()).unwrap();
        assert_ne!(id, "client-chosen");
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }

    #[tokio::test]
    async fn dropped_body_reports_abort() {
        let recorder = Arc::new(Recorder::default());
        let app = Router::new()
            .route(
                "/stream",
                get(|| async {
                    let chunks = futures_util::stream::iter(vec![
                        Ok::<_, std::io::Error>(Bytes::from_static(b"a")),
                        Ok(Bytes::from_static(b"b")),
                    ]);
                    Body::from_stream(chunks)
                }),
            )
            .layer(from_fn_with_state(
                Arc::new(InterceptorChain::new().with(Recording(recorder.clone()))),
                intercept,
            ));

        let response = app
            .oneshot(Request::builder().uri("/stream").body(Body::empty()).unwrap())
            .await
            .unwrap();
        drop(response);

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(events.last().map(String::as_str), Some("end aborted"));
    }

    #[tokio::test]
    async fn cancelled_request_reports_abort() {
        let recorder = Arc::new(Recorder::default());
        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .layer(from_fn_with_state(
                Arc::new(InterceptorChain::new().with(Recording(recorder.clone()))),
                intercept,
            ));

        let call = app.oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap());
        let result = tokio::time::timeout(Duration::from_millis(50), call).await;
        assert!(result.is_err());

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(events, vec!["start GET /slow", "end aborted"]);
    }

    #[tokio::test]
    async fn end_hook_fires_once() {
        let recorder = Arc::new(Recorder::default());
        let app = app(InterceptorChain::new().with(Recording(recorder.clone())));

        let response = app
            .oneshot(Request::builder().uri("/echo-id").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = response.into_body();
        let _ = axum::body::to_bytes(body, usize::MAX).await.unwrap();

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(events.iter().filter(|e| e.starts_with("end")).count(), 1);
        assert_eq!(events.last().map(String::as_str), Some("end completed"));
    }

    #[tokio::test]
    async fn upgrade_requests_bypass_interceptors() {
        let recorder = Arc::new(Recorder::default());
        let app = app(InterceptorChain::new().with(Recording(recorder.clone())));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/echo-id")
                    .header("upgrade", "websocket")
                    .header("connection", "upgrade")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"none");
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn panicking_hooks_do_not_fail_requests() {
        let recorder = Arc::new(Recorder::default());
        let app = app(
            InterceptorChain::new()
                .with(Panicking)
                .with(Recording(recorder.clone())),
        );

        let response = app
            .oneshot(Request::builder().uri("/echo-id").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        drop(response);

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(events[0], "start GET /echo-id");
        assert_eq!(events[1], "response 200");
    }
}
