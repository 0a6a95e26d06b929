//! Startup orchestration.
//!
//! Order: metrics recorder, listener, server. Any failure is fatal and
//! reported to `main`.

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::Settings;
use crate::http::HttpServer;
use crate::lifecycle::{shutdown_signal, Shutdown};
use crate::observability::metrics::init_metrics;

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Start every subsystem and serve until a shutdown signal arrives.
pub async fn run(settings: Settings) -> Result<(), StartupError> {
    if settings.app.metrics_enabled {
        let addr: SocketAddr = settings
            .app
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(settings.app.metrics_address.clone()))?;
        init_metrics(addr)?;
    }

    let address = settings.api.bind_address();
    let listener = TcpListener::bind((settings.api.host.as_str(), settings.api.port))
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    HttpServer::new(settings).run(listener, server_shutdown).await?;
    Ok(())
}
