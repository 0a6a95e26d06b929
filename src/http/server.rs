//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router with all handlers
//! - Wire up middleware (interceptors, request ID propagation, failures)
//! - Answer unknown paths and wrong methods with error envelopes
//! - Bind server to listener and shut down gracefully

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::propagate_header::PropagateHeaderLayer;

use crate::api;
use crate::config::Settings;
use crate::http::error::AppError;
use crate::http::middleware::{handle_failures, intercept, InterceptorChain};
use crate::http::request::X_REQUEST_ID;
use crate::observability::metrics::MetricsInterceptor;
use crate::observability::LoggingInterceptor;

/// HTTP server for the lead scoring service.
pub struct HttpServer {
    router: Router,
    settings: Settings,
}

impl HttpServer {
    /// Create a new HTTP server with the given settings.
    pub fn new(settings: Settings) -> Self {
        let router = build_router();
        Self { router, settings }
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            env = self.settings.app.env.as_deref().unwrap_or("unset"),
            debug = self.settings.app.debug,
            "HTTP server starting"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The fully assembled router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Interceptors installed on every server.
pub fn default_interceptors() -> InterceptorChain {
    InterceptorChain::new()
        .with(LoggingInterceptor::new())
        .with(MetricsInterceptor)
}

/// Application routes with the full middleware stack.
pub fn build_router() -> Router {
    with_middleware(api::routes(), default_interceptors())
}

/// Wrap `routes` in the request-lifecycle stack.
///
/// Unknown paths and wrong methods are answered with error envelopes, so
/// fallbacks are installed before the layers.
pub fn with_middleware(routes: Router, interceptors: InterceptorChain) -> Router {
    routes
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn(handle_failures))
        .layer(PropagateHeaderLayer::new(X_REQUEST_ID))
        .layer(middleware::from_fn_with_state(
            Arc::new(interceptors),
            intercept,
        ))
}

async fn not_found() -> AppError {
    AppError::not_found()
}

async fn method_not_allowed() -> AppError {
    AppError::method_not_allowed()
}
