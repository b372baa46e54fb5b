// custodian-core/src/domain/quality/score.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::quality::result::{DataQualityResult, QualityStatus};
use crate::domain::quality::rule::{DataQualityRule, RuleType, Severity};

/// `round(passed / total * 100)`, and 100 for an empty rule set.
pub fn quality_score(passed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let ratio = passed.min(total) as f64 / total as f64;
    (ratio * 100.0).round() as u8
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityTally {
    pub total_rules: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
}

impl QualityTally {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = QualityStatus>,
    {
        let mut tally = Self::default();
        for status in statuses {
            tally.record(status);
        }
        tally
    }

    pub fn record(&mut self, status: QualityStatus) {
        self.total_rules += 1;
        match status {
            QualityStatus::Pass => self.passed += 1,
            QualityStatus::Fail => self.failed += 1,
            QualityStatus::Error => self.errors += 1,
        }
    }

    pub fn quality_score(&self) -> u8 {
        quality_score(self.passed, self.total_rules)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalFailure {
    pub rule_id: String,
    pub dataset_id: String,
    pub rule_type: RuleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    pub failures_found: u64,
    pub run_date: DateTime<Utc>,
}

/// CRITICAL rules whose latest result is FAIL, in rule id order.
pub fn critical_failures(
    rules: &[DataQualityRule],
    latest: &[DataQualityResult],
) -> Vec<CriticalFailure> {
    let by_rule: HashMap<&str, &DataQualityResult> =
        latest.iter().map(|r| (r.rule_id.as_str(), r)).collect();

    let mut failures: Vec<CriticalFailure> = rules
        .iter()
        .filter(|rule| rule.severity == Severity::Critical)
        .filter_map(|rule| {
            let result = by_rule.get(rule.id.as_str())?;
            (result.status == QualityStatus::Fail).then(|| CriticalFailure {
                rule_id: rule.id.clone(),
                dataset_id: rule.dataset_id.clone(),
                rule_type: rule.rule_type,
                field_name: rule.field_name.clone(),
                failures_found: result.failures_found,
                run_date: result.run_date,
            })
        })
        .collect();
    failures.sort_by(|a, b| a.rule_id.cmp(&b.rule_id));
    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_rule_set_scores_100() {
        assert_eq!(quality_score(0, 0), 100);
        assert_eq!(QualityTally::default().quality_score(), 100);
    }

    #[test]
    fn test_score_rounds() {
        assert_eq!(quality_score(2, 3), 67);
        assert_eq!(quality_score(1, 3), 33);
        assert_eq!(quality_score(1, 8), 13); // 12.5 rounds away from zero
    }

    #[test]
    fn test_score_stays_in_bounds() {
        for total in 0..25 {
            for passed in 0..=total {
                let score = quality_score(passed, total);
                assert!(score <= 100);
            }
        }
        assert_eq!(quality_score(5, 5), 100);
        assert_eq!(quality_score(0, 5), 0);
    }

    #[test]
    fn test_tally_counts_each_status() {
        let tally = QualityTally::from_statuses([
            QualityStatus::Pass,
            QualityStatus::Fail,
            QualityStatus::Error,
            QualityStatus::Pass,
        ]);
        assert_eq!(tally.total_rules, 4);
        assert_eq!(tally.passed, 2);
        assert_eq!(tally.failed, 1);
        assert_eq!(tally.errors, 1);
        assert_eq!(tally.quality_score(), 50);
    }

    #[test]
    fn test_critical_failures_only_lists_failing_critical_rules() {
        let rule = |id: &str, severity: Severity| DataQualityRule {
            id: id.into(),
            dataset_id: "d1".into(),
            field_name: Some("score".into()),
            rule_type: RuleType::NullCheck,
            criteria: serde_json::json!({}),
            severity,
            is_active: true,
            description: None,
        };
        let result = |id: i64, rule_id: &str, status: QualityStatus| DataQualityResult {
            id,
            rule_id: rule_id.into(),
            status,
            records_checked: 10,
            failures_found: 2,
            anomaly_score: None,
            execution_duration_ms: 1,
            run_date: Utc::now(),
            message: None,
        };

        let rules = vec![
            rule("c-fail", Severity::Critical),
            rule("c-pass", Severity::Critical),
            rule("c-error", Severity::Critical),
            rule("w-fail", Severity::Warning),
            rule("c-never-run", Severity::Critical),
        ];
        let latest = vec![
            result(1, "c-fail", QualityStatus::Fail),
            result(2, "c-pass", QualityStatus::Pass),
            result(3, "c-error", QualityStatus::Error),
            result(4, "w-fail", QualityStatus::Fail),
        ];

        let failures = critical_failures(&rules, &latest);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].rule_id, "c-fail");
        assert_eq!(failures[0].failures_found, 2);
    }
}
