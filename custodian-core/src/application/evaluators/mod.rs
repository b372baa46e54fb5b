// custodian-core/src/application/evaluators/mod.rs
//
// One evaluator per rule type, looked up by `RuleType`. The registry is the
// error boundary: whatever an evaluator fails with becomes an ERROR outcome.

pub mod anomaly;
pub mod custom_sql;
pub mod null_check;
pub mod range_check;

use async_trait::async_trait;
use miette::Diagnostic;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::catalog::Dataset;
use crate::domain::error::DomainError;
use crate::domain::quality::criteria::parse_criteria;
use crate::domain::quality::{DataQualityRule, RuleOutcome, RuleType};
use crate::domain::sql::{Identifier, SqlQuery};
use crate::ports::query::{QueryExecutor, QueryRow};

pub use anomaly::AnomalyEvaluator;
pub use custom_sql::CustomSqlEvaluator;
pub use null_check::NullCheckEvaluator;
pub use range_check::RangeCheckEvaluator;

#[derive(Error, Debug, Diagnostic)]
pub enum EvaluationError {
    #[error("Query against dataset '{dataset}' failed: {reason}")]
    #[diagnostic(
        code(custodian::evaluation::query),
        help("Check that the dataset table exists and the field is spelled as in the catalog.")
    )]
    DatasetQueryFailed { dataset: String, reason: String },

    #[error("Invalid {rule_type} criteria: {reason}")]
    #[diagnostic(code(custodian::evaluation::criteria))]
    InvalidCriteria { rule_type: RuleType, reason: String },

    #[error("{0} rules need a fieldName")]
    #[diagnostic(code(custodian::evaluation::missing_field))]
    MissingField(RuleType),

    #[error("Rule evaluation timed out after {0} ms")]
    #[diagnostic(
        code(custodian::evaluation::timeout),
        help("Raise quality.rule_timeout_ms in custodian.yaml.")
    )]
    Timeout(u64),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Rejected(#[from] DomainError),
}

#[async_trait]
pub trait RuleEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        dataset: &Dataset,
        rule: &DataQualityRule,
        executor: &dyn QueryExecutor,
    ) -> Result<RuleOutcome, EvaluationError>;
}

pub struct EvaluatorRegistry {
    evaluators: HashMap<RuleType, Box<dyn RuleEvaluator>>,
}

impl EvaluatorRegistry {
    /// A registry with no evaluators: every rule falls back to `RuleOutcome::not_evaluated`.
    pub fn empty() -> Self {
        Self {
            evaluators: HashMap::new(),
        }
    }

    /// NULL_CHECK, RANGE_CHECK, CUSTOM_SQL and ANOMALY_DETECTION.
    /// FOREIGN_KEY is deliberately left unregistered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(RuleType::NullCheck, Box::new(NullCheckEvaluator));
        registry.register(RuleType::RangeCheck, Box::new(RangeCheckEvaluator));
        registry.register(RuleType::CustomSql, Box::new(CustomSqlEvaluator));
        registry.register(RuleType::AnomalyDetection, Box::new(AnomalyEvaluator));
        registry
    }

    pub fn register(&mut self, rule_type: RuleType, evaluator: Box<dyn RuleEvaluator>) {
        self.evaluators.insert(rule_type, evaluator);
    }

    pub fn supports(&self, rule_type: RuleType) -> bool {
        self.evaluators.contains_key(&rule_type)
    }

    /// Never fails. Unregistered types pass vacuously, evaluator errors become ERROR.
    pub async fn evaluate(
        &self,
        dataset: &Dataset,
        rule: &DataQualityRule,
        executor: &dyn QueryExecutor,
    ) -> RuleOutcome {
        let Some(evaluator) = self.evaluators.get(&rule.rule_type) else {
            debug!(rule = %rule.id, rule_type = %rule.rule_type, "No evaluator registered, using fallback");
            return RuleOutcome::not_evaluated();
        };

        match evaluator.evaluate(dataset, rule, executor).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(rule = %rule.id, error = %e, "Rule evaluation failed");
                RuleOutcome::error(e.to_string())
            }
        }
    }
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ── Shared helpers ───────────────────────────────────────────────────

pub(crate) fn criteria_of<T: DeserializeOwned>(rule: &DataQualityRule) -> Result<T, EvaluationError> {
    parse_criteria(&rule.criteria).map_err(|e| EvaluationError::InvalidCriteria {
        rule_type: rule.rule_type,
        reason: e.to_string(),
    })
}

/// Validated table and field identifiers for column-level rules.
pub(crate) fn table_and_field(
    dataset: &Dataset,
    rule: &DataQualityRule,
) -> Result<(Identifier, Identifier), EvaluationError> {
    let field = rule
        .field_name
        .as_deref()
        .filter(|f| !f.trim().is_empty())
        .ok_or(EvaluationError::MissingField(rule.rule_type))?;
    Ok((Identifier::parse(&dataset.name)?, Identifier::parse(field)?))
}

/// Runs `query` and requires a first row.
pub(crate) async fn fetch_row(
    executor: &dyn QueryExecutor,
    dataset: &Dataset,
    query: &SqlQuery,
) -> Result<QueryRow, EvaluationError> {
    let failed = |reason: String| EvaluationError::DatasetQueryFailed {
        dataset: dataset.name.clone(),
        reason,
    };
    executor
        .fetch_one(query)
        .await
        .map_err(|e| failed(e.to_string()))?
        .ok_or_else(|| failed("query returned no rows".into()))
}

pub(crate) fn required_count(
    row: &QueryRow,
    column: &str,
    dataset: &Dataset,
) -> Result<u64, EvaluationError> {
    row.get_count(column)
        .ok_or_else(|| EvaluationError::DatasetQueryFailed {
            dataset: dataset.name.clone(),
            reason: format!("column '{}' missing or not a count", column),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod mock {
    use super::*;
    use crate::domain::catalog::Sensitivity;
    use crate::domain::quality::Severity;
    use crate::error::CustodianError;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Answers every query with the same row (or error) and records what it was asked.
    pub struct MockExecutor {
        pub executed_queries: Arc<Mutex<Vec<SqlQuery>>>,
        response: Result<Option<QueryRow>, String>,
        delay: Option<Duration>,
    }

    impl MockExecutor {
        pub fn returning(row: QueryRow) -> Self {
            Self {
                executed_queries: Arc::new(Mutex::new(Vec::new())),
                response: Ok(Some(row)),
                delay: None,
            }
        }

        pub fn empty() -> Self {
            Self {
                response: Ok(None),
                ..Self::returning(QueryRow::new())
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                response: Err(message.to_string()),
                ..Self::returning(QueryRow::new())
            }
        }

        pub fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn queries(&self) -> Vec<SqlQuery> {
            self.executed_queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueryExecutor for MockExecutor {
        async fn fetch_one(&self, query: &SqlQuery) -> Result<Option<QueryRow>, CustodianError> {
            self.executed_queries.lock().unwrap().push(query.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.response
                .clone()
                .map_err(CustodianError::InternalError)
        }
    }

    pub fn dataset(name: &str) -> Dataset {
        Dataset {
            id: format!("ds-{}", name.to_lowercase()),
            name: name.into(),
            sensitivity: Sensitivity::Internal,
            domain: None,
            owner_team: None,
            retention_policy: None,
            description: None,
        }
    }

    pub fn rule(
        id: &str,
        dataset: &Dataset,
        rule_type: RuleType,
        field: Option<&str>,
        criteria: serde_json::Value,
    ) -> DataQualityRule {
        DataQualityRule {
            id: id.into(),
            dataset_id: dataset.id.clone(),
            field_name: field.map(str::to_string),
            rule_type,
            criteria,
            severity: Severity::Warning,
            is_active: true,
            description: None,
        }
    }
}
