//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request interceptor hooks:
//!     → request_log.rs (request_received / request_completed records)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Failure layer:
//!     → error_log.rs (validation / http / internal error records)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, text or JSON, non-blocking)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every record is a flat serialized structure for machine parsing
//! - Request ID flows through every record
//! - Emitting a record never fails or delays the request

pub mod error_log;
pub mod logging;
pub mod metrics;
pub mod request_log;

pub use error_log::ErrorLogger;
pub use request_log::{LoggingInterceptor, StructuredLogger};
