// custodian-core/src/ports/query.rs
//
// Raw query execution against the data being governed. Evaluators only ever
// see this port, never a concrete database.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::sql::SqlQuery;
use crate::error::CustodianError;

/// One result row, keyed by lowercased column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRow {
    columns: BTreeMap<String, Value>,
}

impl QueryRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.insert(column, value.into());
        self
    }

    pub fn insert(&mut self, column: &str, value: Value) {
        self.columns.insert(column.to_lowercase(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(&column.to_lowercase())
    }

    /// Numeric value of `column`. Numeric strings are accepted (DECIMAL/HUGEINT
    /// results may arrive as text); NULL reads as `None`.
    pub fn get_f64(&self, column: &str) -> Option<f64> {
        match self.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Non-negative integral count. Negative or fractional values are rejected.
    pub fn get_count(&self, column: &str) -> Option<u64> {
        let value = self.get_f64(column)?;
        if value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
            Some(value as u64)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Executes `query` with its bound parameters and returns the first row, if any.
    async fn fetch_one(&self, query: &SqlQuery) -> Result<Option<QueryRow>, CustodianError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let row = QueryRow::new().with("Failures", 3);
        assert_eq!(row.get_count("failures"), Some(3));
        assert_eq!(row.get_count("FAILURES"), Some(3));
    }

    #[test]
    fn test_numeric_coercions() {
        let row = QueryRow::new()
            .with("huge", "170141183460469231731687303715884105727")
            .with("dec", "12.50")
            .with("neg", -1)
            .with("missing", Value::Null);
        assert!(row.get_f64("huge").is_some());
        assert_eq!(row.get_f64("dec"), Some(12.5));
        assert_eq!(row.get_count("dec"), None);
        assert_eq!(row.get_count("neg"), None);
        assert_eq!(row.get_f64("missing"), None);
        assert_eq!(row.get_f64("absent"), None);
        assert_eq!(QueryRow::new().with("flag", json!(true)).get_f64("flag"), Some(1.0));
    }
}
