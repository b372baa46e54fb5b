// custodian-core/src/domain/governance/health.rs

use serde::{Deserialize, Serialize};

// Fixed weights of the governance health score. They sum to 1.0.
const QUALITY_WEIGHT: f64 = 0.30;
const CATALOG_WEIGHT: f64 = 0.25;
const LINEAGE_WEIGHT: f64 = 0.20;
const OWNERSHIP_WEIGHT: f64 = 0.10;
const CONSENT_WEIGHT: f64 = 0.15;

/// `round(part / whole * 100)`, or `when_empty` if `whole` is 0.
pub fn percentage(part: u64, whole: u64, when_empty: u8) -> u8 {
    if whole == 0 {
        return when_empty;
    }
    let ratio = part.min(whole) as f64 / whole as f64;
    (ratio * 100.0).round() as u8
}

/// Raw counts the health score is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HealthInputs {
    pub quality_score: u8,
    pub dataset_count: u64,
    pub node_count: u64,
    pub edge_count: u64,
    pub owner_count: u64,
    pub consent_coverage: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub quality_score: u8,
    pub catalog_score: u8,
    pub lineage_score: f64,
    pub ownership_score: u8,
    pub consent_coverage: u8,
    pub health_score: u8,
}

impl ScoreBreakdown {
    pub fn compute(inputs: &HealthInputs) -> Self {
        let catalog_score = if inputs.dataset_count >= 1 { 100 } else { 0 };
        let ownership_score = if inputs.owner_count >= 1 { 100 } else { 50 };
        let lineage_score =
            (inputs.edge_count as f64 / inputs.node_count.max(1) as f64 * 50.0).min(100.0);

        let weighted = f64::from(inputs.quality_score) * QUALITY_WEIGHT
            + f64::from(catalog_score) * CATALOG_WEIGHT
            + lineage_score * LINEAGE_WEIGHT
            + f64::from(ownership_score) * OWNERSHIP_WEIGHT
            + f64::from(inputs.consent_coverage) * CONSENT_WEIGHT;

        Self {
            quality_score: inputs.quality_score,
            catalog_score,
            lineage_score,
            ownership_score,
            consent_coverage: inputs.consent_coverage,
            health_score: weighted.round().clamp(0.0, 100.0) as u8,
        }
    }
}
