// custodian-core/src/domain/quality/criteria.rs
//
// Typed views over the free-form `criteria` JSON stored with each rule.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::compliance::MetricState;

/// z-score convention: |z| >= 3 is an anomaly.
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 3.0;

/// Parses rule criteria into `T`. A JSON `null` is read as an empty object.
pub fn parse_criteria<T: DeserializeOwned>(value: &serde_json::Value) -> Result<T, serde_json::Error> {
    match value {
        serde_json::Value::Null => serde_json::from_value(serde_json::json!({})),
        other => T::deserialize(other),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NullCheckCriteria {
    pub allow_null: Option<bool>,
}

impl NullCheckCriteria {
    pub fn nulls_allowed(&self) -> bool {
        self.allow_null.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RangeCheckCriteria {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomSqlCriteria {
    pub sql: String,
    #[serde(default)]
    pub expected_value: Option<f64>,
}

impl CustomSqlCriteria {
    pub fn tolerated_failures(&self) -> f64 {
        self.expected_value.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyCriteria {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Precomputed z-score.
    #[serde(default)]
    pub score: Option<f64>,
    /// Query returning either an `anomaly_score` column or a `value` column
    /// to score against `baseline`.
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub baseline: Option<MetricState>,
}

fn default_threshold() -> f64 {
    DEFAULT_ANOMALY_THRESHOLD
}
