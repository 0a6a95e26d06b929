//! Lead scoring service.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client Request
//!   ──────────────▶ interceptor ──▶ propagate ──▶ failures ──▶ router ──▶ handler
//!                   (request ID,     x-request-id  (AppError,    /health
//!                    lifecycle logs,               panics →      /lead-scoring/*
//!                    metrics)                      envelopes)
//!   Client Response
//!   ◀────────────── completion record ◀──────── error record ◀─── Result<_, AppError>
//! ```

use std::path::PathBuf;

use clap::Parser;

use lead_scoring_service::config::load_settings_with_env_file;
use lead_scoring_service::lifecycle;
use lead_scoring_service::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "lead-scoring-service")]
#[command(about = "Lead scoring HTTP service", long_about = None)]
struct Cli {
    /// Env file read before the process environment.
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let settings = load_settings_with_env_file(&cli.env_file)?;
    let _log_guard = init_logging(&settings.app)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        env_file = %cli.env_file.display(),
        env_file_found = cli.env_file.exists(),
        env = settings.app.env.as_deref().unwrap_or("unset"),
        bind_address = %settings.api.bind_address(),
        metrics_enabled = settings.app.metrics_enabled,
        "Configuration loaded"
    );

    if let Err(e) = lifecycle::run(settings).await {
        tracing::error!(error = %e, "Service failed");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
