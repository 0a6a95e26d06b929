//! Health check endpoint.

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::observability::logging::timestamp_now;

/// Name reported by the health check.
pub const SERVICE_NAME: &str = "MLFlow FastAPI Backend";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub timestamp: String,
}

pub async fn basic_health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        timestamp: timestamp_now(),
    })
}
