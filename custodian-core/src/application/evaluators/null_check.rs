// custodian-core/src/application/evaluators/null_check.rs

use async_trait::async_trait;

use super::{EvaluationError, RuleEvaluator, criteria_of, fetch_row, required_count, table_and_field};
use crate::domain::catalog::Dataset;
use crate::domain::quality::{DataQualityRule, NullCheckCriteria, RuleOutcome};
use crate::domain::sql::SqlQuery;
use crate::ports::query::QueryExecutor;

pub struct NullCheckEvaluator;

#[async_trait]
impl RuleEvaluator for NullCheckEvaluator {
    async fn evaluate(
        &self,
        dataset: &Dataset,
        rule: &DataQualityRule,
        executor: &dyn QueryExecutor,
    ) -> Result<RuleOutcome, EvaluationError> {
        let criteria: NullCheckCriteria = criteria_of(rule)?;
        let (table, field) = table_and_field(dataset, rule)?;

        let row = fetch_row(executor, dataset, &SqlQuery::null_profile(&table, &field)).await?;
        let total = required_count(&row, "total", dataset)?;
        let nulls = required_count(&row, "nulls", dataset)?;

        Ok(RuleOutcome::checked(
            nulls > 0 && !criteria.nulls_allowed(),
            total,
            nulls,
        ))
    }
}
