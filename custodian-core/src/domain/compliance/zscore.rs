// custodian-core/src/domain/compliance/zscore.rs

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ZScoreError {
    #[error("Not enough history for Z-Score check on '{0}' (baseline needs at least 2 samples)")]
    NotEnoughHistory(String),
    #[error("Non-finite value for '{0}'")]
    NonFinite(String),
}

/// Historical distribution of a metric (population variance).
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct MetricState {
    pub mean: f64,
    pub variance: f64,
    pub count: u64,
}

pub struct ZScoreCheck;

impl ZScoreCheck {
    /// Absolute z-score of `current_value` against `state`.
    /// A flat baseline (stddev ~ 0) scores 0: there is no spread to deviate from.
    pub fn score(metric_name: &str, current_value: f64, state: &MetricState) -> Result<f64, ZScoreError> {
        // Need at least count >= 2 to have a meaningful variance
        if state.count < 2 {
            return Err(ZScoreError::NotEnoughHistory(metric_name.to_string()));
        }
        if !current_value.is_finite() || !state.mean.is_finite() || !state.variance.is_finite() {
            return Err(ZScoreError::NonFinite(metric_name.to_string()));
        }

        let stddev = state.variance.max(0.0).sqrt();
        if stddev > 1e-9 {
            Ok(((current_value - state.mean) / stddev).abs())
        } else {
            Ok(0.0)
        }
    }

    /// Scores at or above the threshold are anomalies.
    pub fn is_anomaly(score: f64, threshold: f64) -> bool {
        score.abs() >= threshold
    }
}
