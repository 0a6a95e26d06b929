//! Lead scoring service library.
//!
//! A small HTTP service with a stub scoring endpoint. Most of the code is the
//! request-lifecycle stack: correlation IDs, structured request and failure
//! logging, and normalization of every failure into one JSON envelope.

pub mod api;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::Settings;
pub use http::{AppError, HttpServer};
pub use lifecycle::Shutdown;
