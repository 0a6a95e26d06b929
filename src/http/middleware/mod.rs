//! Request-lifecycle middleware.
//!
//! # Order (outermost first)
//! ```text
//! interceptor.rs   correlation ID, lifecycle hooks (logging, metrics)
//! propagate header x-request-id copied onto the response
//! failures.rs      AppError / panic → error envelope + error record
//! router           handlers
//! ```

pub mod failures;
pub mod interceptor;

pub use failures::handle_failures;
pub use interceptor::{intercept, BodyOutcome, InterceptorChain, RequestInterceptor, ResponseHead};
