//! Lead scoring endpoints.

use axum::Json;

use crate::api::schemas::{LeadScoringRequest, LeadScoringResponse, ProbeStatus};
use crate::http::error::AppError;
use crate::http::extract::ValidatedJson;

/// Score returned for every lead until a model is wired in.
pub const PLACEHOLDER_SCORE: f64 = 25.0;

/// Score a lead. The score does not depend on the features yet.
pub async fn score(
    ValidatedJson(request): ValidatedJson<LeadScoringRequest>,
) -> Result<Json<LeadScoringResponse>, AppError> {
    tracing::debug!(
        lead_id = request.lead_id,
        feature_count = request.features.len(),
        "Scoring lead"
    );
    Ok(Json(LeadScoringResponse {
        lead_id: request.lead_id,
        score: PLACEHOLDER_SCORE,
    }))
}

pub async fn live() -> Json<ProbeStatus> {
    Json(ProbeStatus {
        status: "ok".to_string(),
    })
}

pub async fn ready() -> Json<ProbeStatus> {
    Json(ProbeStatus {
        status: "ok".to_string(),
    })
}
