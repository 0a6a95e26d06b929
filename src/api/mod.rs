//! Route groups served by the service.

pub mod health;
pub mod lead_scoring;
pub mod schemas;

use axum::{
    routing::{get, post},
    Router,
};

use self::health::basic_health_check;
use self::lead_scoring::{live, ready, score};

/// `/health` routes.
pub fn health_router() -> Router {
    Router::new()
        .route("/health", get(basic_health_check))
        .route("/health/", get(basic_health_check))
}

/// `/lead-scoring` routes.
pub fn lead_scoring_router() -> Router {
    Router::new()
        .route("/lead-scoring/score", post(score))
        .route("/lead-scoring/live", get(live))
        .route("/lead-scoring/ready", get(ready))
}

/// All application routes, without middleware.
pub fn routes() -> Router {
    Router::new()
        .merge(health_router())
        .merge(lead_scoring_router())
}
