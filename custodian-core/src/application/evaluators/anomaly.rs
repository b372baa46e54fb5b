// custodian-core/src/application/evaluators/anomaly.rs
//
// Anomaly detection consumes a z-score, it does not learn one. The score is taken
// from, in order: `criteria.score`, the `anomaly_score` column of `criteria.sql`,
// or the `value` column of `criteria.sql` scored against `criteria.baseline`.

use async_trait::async_trait;
use tracing::debug;

use super::{EvaluationError, RuleEvaluator, criteria_of, fetch_row};
use crate::domain::catalog::Dataset;
use crate::domain::compliance::ZScoreCheck;
use crate::domain::quality::{AnomalyCriteria, DataQualityRule, RuleOutcome};
use crate::domain::sql::SqlQuery;
use crate::ports::query::QueryExecutor;

const SCORE_COLUMN: &str = "anomaly_score";
const VALUE_COLUMN: &str = "value";

pub struct AnomalyEvaluator;

impl AnomalyEvaluator {
    async fn resolve_score(
        criteria: &AnomalyCriteria,
        rule: &DataQualityRule,
        dataset: &Dataset,
        executor: &dyn QueryExecutor,
    ) -> Result<f64, EvaluationError> {
        let invalid = |reason: String| EvaluationError::InvalidCriteria {
            rule_type: rule.rule_type,
            reason,
        };

        if let Some(score) = criteria.score {
            return Ok(score);
        }

        let Some(sql) = criteria.sql.as_deref() else {
            return Err(invalid("no score source: set score or sql".into()));
        };
        let row = fetch_row(executor, dataset, &SqlQuery::read_only(sql)?).await?;

        if let Some(score) = row.get_f64(SCORE_COLUMN) {
            return Ok(score);
        }

        match (row.get_f64(VALUE_COLUMN), criteria.baseline.as_ref()) {
            (Some(value), Some(baseline)) => {
                ZScoreCheck::score(&rule.id, value, baseline).map_err(|e| invalid(e.to_string()))
            }
            (Some(_), None) => Err(invalid(format!(
                "query returned '{}' but no baseline is configured",
                VALUE_COLUMN
            ))),
            (None, _) => Err(EvaluationError::DatasetQueryFailed {
                dataset: dataset.name.clone(),
                reason: format!(
                    "query returned neither '{}' nor '{}'",
                    SCORE_COLUMN, VALUE_COLUMN
                ),
            }),
        }
    }
}

#[async_trait]
impl RuleEvaluator for AnomalyEvaluator {
    async fn evaluate(
        &self,
        dataset: &Dataset,
        rule: &DataQualityRule,
        executor: &dyn QueryExecutor,
    ) -> Result<RuleOutcome, EvaluationError> {
        let criteria: AnomalyCriteria = criteria_of(rule)?;
        if !criteria.threshold.is_finite() || criteria.threshold <= 0.0 {
            return Err(EvaluationError::InvalidCriteria {
                rule_type: rule.rule_type,
                reason: format!("threshold must be positive, got {}", criteria.threshold),
            });
        }

        let score = Self::resolve_score(&criteria, rule, dataset, executor).await?;
        if !score.is_finite() {
            return Err(EvaluationError::DatasetQueryFailed {
                dataset: dataset.name.clone(),
                reason: format!("anomaly score is not a finite number ({})", score),
            });
        }
        let anomalous = ZScoreCheck::is_anomaly(score, criteria.threshold);
        debug!(rule = %rule.id, score, threshold = criteria.threshold, anomalous, "Anomaly score resolved");

        Ok(RuleOutcome::checked(anomalous, 1, u64::from(anomalous)).with_anomaly_score(score.abs()))
    }
}
