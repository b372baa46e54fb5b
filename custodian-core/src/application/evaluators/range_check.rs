// custodian-core/src/application/evaluators/range_check.rs

use async_trait::async_trait;

use super::{EvaluationError, RuleEvaluator, criteria_of, fetch_row, required_count, table_and_field};
use crate::domain::catalog::Dataset;
use crate::domain::quality::{DataQualityRule, RangeCheckCriteria, RuleOutcome};
use crate::domain::sql::SqlQuery;
use crate::ports::query::QueryExecutor;

pub struct RangeCheckEvaluator;

#[async_trait]
impl RuleEvaluator for RangeCheckEvaluator {
    async fn evaluate(
        &self,
        dataset: &Dataset,
        rule: &DataQualityRule,
        executor: &dyn QueryExecutor,
    ) -> Result<RuleOutcome, EvaluationError> {
        let criteria: RangeCheckCriteria = criteria_of(rule)?;
        if let (Some(min), Some(max)) = (criteria.min, criteria.max)
            && min > max
        {
            return Err(EvaluationError::InvalidCriteria {
                rule_type: rule.rule_type,
                reason: format!("min ({}) is greater than max ({})", min, max),
            });
        }
        let (table, field) = table_and_field(dataset, rule)?;

        let query = SqlQuery::range_profile(&table, &field, criteria.min, criteria.max);
        let row = fetch_row(executor, dataset, &query).await?;
        let total = required_count(&row, "total", dataset)?;
        let violations = required_count(&row, "violations", dataset)?;

        Ok(RuleOutcome::checked(violations > 0, total, violations))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::mock::*;
    use super::*;
    use crate::domain::quality::{QualityStatus, RuleType};
    use crate::domain::sql::SqlParam;
    use crate::ports::query::QueryRow;
    use serde_json::json;

    #[tokio::test]
    async fn test_violations_fail_and_bounds_are_bound() -> anyhow::Result<()> {
        let ds = dataset("Screening");
        let r = rule("r1", &ds, RuleType::RangeCheck, Some("score"), json!({"min": 0, "max": 100}));
        let executor = MockExecutor::returning(QueryRow::new().with("total", 50).with("violations", 2));

        let outcome = RangeCheckEvaluator.evaluate(&ds, &r, &executor).await?;
        assert_eq!(outcome.status, QualityStatus::Fail);
        assert_eq!(outcome.records_checked, 50);
        assert_eq!(outcome.failures_found, 2);

        let queries = executor.queries();
        assert_eq!(
            queries[0].params,
            vec![SqlParam::Float(0.0), SqlParam::Float(100.0)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_single_bound_passes() -> anyhow::Result<()> {
        let ds = dataset("Screening");
        let r = rule("r1", &ds, RuleType::RangeCheck, Some("score"), json!({"max": 10.5}));
        // HUGEINT sums arrive as text from some drivers
        let executor = MockExecutor::returning(QueryRow::new().with("total", 8).with("violations", "0"));

        let outcome = RangeCheckEvaluator.evaluate(&ds, &r, &executor).await?;
        assert_eq!(outcome.status, QualityStatus::Pass);
        assert_eq!(executor.queries()[0].params, vec![SqlParam::Float(10.5)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_inverted_bounds_are_invalid() {
        let ds = dataset("Screening");
        let r = rule("r1", &ds, RuleType::RangeCheck, Some("score"), json!({"min": 10, "max": 1}));
        let executor = MockExecutor::empty();

        let err = RangeCheckEvaluator.evaluate(&ds, &r, &executor).await.unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidCriteria { .. }));
    }

    #[tokio::test]
    async fn test_non_numeric_bound_is_invalid() {
        let ds = dataset("Screening");
        let r = rule("r1", &ds, RuleType::RangeCheck, Some("score"), json!({"min": "low"}));
        let executor = MockExecutor::empty();

        let err = RangeCheckEvaluator.evaluate(&ds, &r, &executor).await.unwrap_err();
        assert!(err.to_string().starts_with("Invalid RANGE_CHECK criteria"));
    }
}
