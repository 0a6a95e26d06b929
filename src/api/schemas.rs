//! Lead scoring request and response bodies.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::error::{FieldError, LocSegment};
use crate::http::extract::{child_loc, float_map, integer, object, required, FromJsonBody};

/// Body of `POST /lead-scoring/score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadScoringRequest {
    /// Identifier of the lead being scored.
    pub lead_id: i64,
    /// Feature name to value.
    pub features: HashMap<String, f64>,
}

impl FromJsonBody for LeadScoringRequest {
    fn from_json_body(body: &Value) -> Result<Self, Vec<FieldError>> {
        let root = vec![LocSegment::from("body")];
        let fields = object(body, &root).map_err(|e| vec![e])?;
        let mut errors = Vec::new();

        let lead_id = required(fields, "lead_id", &root, &mut errors)
            .and_then(|v| match integer(v, child_loc(&root, "lead_id")) {
                Ok(id) => Some(id),
                Err(e) => {
                    errors.push(e);
                    None
                }
            });

        let features = required(fields, "features", &root, &mut errors)
            .and_then(|v| match float_map(v, child_loc(&root, "features")) {
                Ok(map) => Some(map),
                Err(mut field_errors) => {
                    errors.append(&mut field_errors);
                    None
                }
            });

        match (lead_id, features) {
            (Some(lead_id), Some(features)) if errors.is_empty() => {
                Ok(Self { lead_id, features })
            }
            _ => Err(errors),
        }
    }
}

/// Body returned by `POST /lead-scoring/score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadScoringResponse {
    pub lead_id: i64,
    pub score: f64,
}

/// Body returned by the probes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeStatus {
    pub status: String,
}
