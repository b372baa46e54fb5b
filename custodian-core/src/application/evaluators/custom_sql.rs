// custodian-core/src/application/evaluators/custom_sql.rs
//
// Runs a user supplied SELECT and compares its `failures` column against the
// tolerated count. The query text is parsed first; anything but a single
// read-only query is refused before it reaches the database.

use async_trait::async_trait;

use super::{EvaluationError, RuleEvaluator, criteria_of, fetch_row};
use crate::domain::catalog::Dataset;
use crate::domain::quality::{CustomSqlCriteria, DataQualityRule, RuleOutcome};
use crate::domain::sql::SqlQuery;
use crate::ports::query::QueryExecutor;

const FAILURES_COLUMN: &str = "failures";

pub struct CustomSqlEvaluator;

#[async_trait]
impl RuleEvaluator for CustomSqlEvaluator {
    async fn evaluate(
        &self,
        dataset: &Dataset,
        rule: &DataQualityRule,
        executor: &dyn QueryExecutor,
    ) -> Result<RuleOutcome, EvaluationError> {
        let criteria: CustomSqlCriteria = criteria_of(rule)?;
        let query = SqlQuery::read_only(&criteria.sql)?;

        let row = fetch_row(executor, dataset, &query).await?;
        let failures = row
            .get_f64(FAILURES_COLUMN)
            .ok_or_else(|| EvaluationError::DatasetQueryFailed {
                dataset: dataset.name.clone(),
                reason: format!("query did not return a numeric '{}' column", FAILURES_COLUMN),
            })?;
        if !failures.is_finite() {
            return Err(EvaluationError::DatasetQueryFailed {
                dataset: dataset.name.clone(),
                reason: format!("'{}' is not a finite number ({})", FAILURES_COLUMN, failures),
            });
        }

        Ok(RuleOutcome::checked(
            failures > criteria.tolerated_failures(),
            1,
            failures.max(0.0).round() as u64,
        ))
    }
}
