// custodian-core/src/domain/quality/result.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityStatus {
    Pass,
    Fail,
    Error,
}

impl QualityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QualityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PASS" => Ok(Self::Pass),
            "FAIL" => Ok(Self::Fail),
            "ERROR" => Ok(Self::Error),
            _ => Err(format!("Unknown quality status: {}", s)),
        }
    }
}

/// What an evaluator produces for one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleOutcome {
    pub status: QualityStatus,
    pub records_checked: u64,
    pub failures_found: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RuleOutcome {
    /// FAIL when `failed` holds, PASS otherwise.
    pub fn checked(failed: bool, records_checked: u64, failures_found: u64) -> Self {
        Self {
            status: if failed {
                QualityStatus::Fail
            } else {
                QualityStatus::Pass
            },
            records_checked,
            failures_found,
            anomaly_score: None,
            message: None,
        }
    }

    /// Rule types without an evaluator pass vacuously instead of breaking the batch.
    pub fn not_evaluated() -> Self {
        Self {
            status: QualityStatus::Pass,
            records_checked: 0,
            failures_found: 0,
            anomaly_score: None,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: QualityStatus::Error,
            records_checked: 0,
            failures_found: 0,
            anomaly_score: None,
            message: Some(message.into()),
        }
    }

    pub fn with_anomaly_score(mut self, score: f64) -> Self {
        self.anomaly_score = Some(score);
        self
    }
}

/// A result about to be appended. The store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQualityResult {
    pub rule_id: String,
    pub outcome: RuleOutcome,
    pub execution_duration_ms: u64,
    pub run_date: DateTime<Utc>,
}

/// One immutable execution record. Never updated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityResult {
    pub id: i64,
    pub rule_id: String,
    pub status: QualityStatus,
    pub records_checked: u64,
    pub failures_found: u64,
    #[serde(default)]
    pub anomaly_score: Option<f64>,
    pub execution_duration_ms: u64,
    pub run_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DataQualityResult {
    pub fn from_new(id: i64, new: &NewQualityResult) -> Self {
        Self {
            id,
            rule_id: new.rule_id.clone(),
            status: new.outcome.status,
            records_checked: new.outcome.records_checked,
            failures_found: new.outcome.failures_found,
            anomaly_score: new.outcome.anomaly_score,
            execution_duration_ms: new.execution_duration_ms,
            run_date: new.run_date,
            message: new.outcome.message.clone(),
        }
    }

    /// Recency order: run date first, insertion id breaks ties.
    fn recency_key(&self) -> (DateTime<Utc>, i64) {
        (self.run_date, self.id)
    }
}

/// Derives the most recent result per rule id, sorted by rule id.
pub fn latest_per_rule<I>(results: I) -> Vec<DataQualityResult>
where
    I: IntoIterator<Item = DataQualityResult>,
{
    let mut latest: HashMap<String, DataQualityResult> = HashMap::new();
    for result in results {
        match latest.get(&result.rule_id) {
            Some(current) if current.recency_key() >= result.recency_key() => {}
            _ => {
                latest.insert(result.rule_id.clone(), result);
            }
        }
    }

    let mut out: Vec<DataQualityResult> = latest.into_values().collect();
    out.sort_by(|a, b| a.rule_id.cmp(&b.rule_id));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn result(id: i64, rule: &str, status: QualityStatus, minutes: i64) -> DataQualityResult {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single();
        DataQualityResult {
            id,
            rule_id: rule.into(),
            status,
            records_checked: 10,
            failures_found: 0,
            anomaly_score: None,
            execution_duration_ms: 1,
            run_date: base.unwrap_or_default() + Duration::minutes(minutes),
            message: None,
        }
    }

    #[test]
    fn test_latest_per_rule_takes_greatest_run_date() {
        let latest = latest_per_rule(vec![
            result(1, "r1", QualityStatus::Fail, 10),
            result(2, "r1", QualityStatus::Pass, 5),
            result(3, "r2", QualityStatus::Error, 0),
        ]);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].rule_id, "r1");
        assert_eq!(latest[0].status, QualityStatus::Fail);
        assert_eq!(latest[1].rule_id, "r2");
    }

    #[test]
    fn test_latest_per_rule_breaks_ties_by_id() {
        let latest = latest_per_rule(vec![
            result(7, "r1", QualityStatus::Pass, 0),
            result(4, "r1", QualityStatus::Fail, 0),
        ]);
        assert_eq!(latest[0].id, 7);
    }

    #[test]
    fn test_status_serialization() -> anyhow::Result<()> {
        assert_eq!(serde_json::to_string(&QualityStatus::Error)?, "\"ERROR\"");
        Ok(())
    }
}
