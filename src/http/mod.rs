//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, graceful shutdown)
//!     → middleware/interceptor.rs (request ID, lifecycle records)
//!     → middleware/failures.rs (failure normalization)
//!     → extract.rs (validated JSON bodies)
//!     → api handlers
//!     → error.rs (envelope for anything that failed)
//!     → Send to client
//! ```

pub mod error;
pub mod extract;
pub mod middleware;
pub mod request;
pub mod server;

pub use error::{AppError, ErrorEnvelope, FieldError};
pub use extract::{FromJsonBody, ValidatedJson};
pub use request::{RequestContext, RequestId, X_REQUEST_ID};
pub use server::HttpServer;
