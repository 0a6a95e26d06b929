//! Failure normalization.
//!
//! The single point where failures become client responses. Handlers
//! return [`AppError`]; it travels up in the response extensions and is
//! rendered here with the request's correlation ID. Panics in handlers are
//! caught here as well and treated as internal failures.

use std::panic::AssertUnwindSafe;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use futures_util::FutureExt;

use crate::http::error::{install_panic_hook, AppError, UnhandledFailure};
use crate::http::request::RequestContext;
use crate::observability::metrics::record_failure;
use crate::observability::ErrorLogger;

/// Middleware rendering every [`AppError`] into its envelope.
///
/// Use with `axum::middleware::from_fn`.
pub async fn handle_failures(request: Request, next: Next) -> Response {
    install_panic_hook();
    let ctx = RequestContext::from_request(&request);

    let failure = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(mut response) => match response.extensions_mut().remove::<AppError>() {
            Some(failure) => failure,
            None => return response,
        },
        Err(payload) => AppError::from_panic(payload),
    };

    render_failure(&failure, &ctx)
}

/// Log `failure` once and build its response.
pub fn render_failure(failure: &AppError, ctx: &RequestContext) -> Response {
    let logger = ErrorLogger;
    match failure {
        AppError::Validation(details) => {
            record_failure("validation");
            logger.log_validation_error(ctx, details);
        }
        AppError::Http { status, detail } => {
            record_failure("http");
            logger.log_http_error(ctx, *status, detail);
        }
        AppError::Internal(internal) => {
            record_failure("internal");
            logger.log_internal_error(ctx, internal);
        }
    }

    let mut response = failure.render(ctx.request_id.as_str());
    if matches!(failure, AppError::Internal(_)) {
        response.extensions_mut().insert(UnhandledFailure);
    }
    response
}
