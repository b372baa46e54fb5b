// custodian-core/src/domain/sql/mod.rs
//
// Query construction for rule evaluators. Identifiers are validated then quoted,
// values always travel as bound parameters.

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::fmt;
use std::sync::OnceLock;

use crate::domain::error::DomainError;

fn re_identifier() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap_or_else(|_| {
            // Hardcoded pattern, cannot fail.
            Regex::new("$^").unwrap_or_else(|_| unreachable!())
        })
    })
}

/// A table or column name that is safe to splice into SQL once quoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier(String);

impl Identifier {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if re_identifier().is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(DomainError::InvalidIdentifier(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlParam {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// SQL text with positional `?` placeholders and their bound values.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl SqlQuery {
    /// Total row count plus the number of NULLs in `column`.
    /// Columns: `total`, `nulls`.
    pub fn null_profile(table: &Identifier, column: &Identifier) -> Self {
        Self {
            sql: format!(
                "SELECT COUNT(*) AS total, COALESCE(SUM(CASE WHEN {col} IS NULL THEN 1 ELSE 0 END), 0) AS nulls FROM {table}",
                col = column.quoted(),
                table = table.quoted()
            ),
            params: Vec::new(),
        }
    }

    /// Total row count plus rows whose `column` falls outside `[min, max]`.
    /// Columns: `total`, `violations`. NULLs are not violations.
    pub fn range_profile(
        table: &Identifier,
        column: &Identifier,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Self {
        let col = column.quoted();
        let mut predicates = Vec::new();
        let mut params = Vec::new();
        if let Some(min) = min {
            predicates.push(format!("{} < ?", col));
            params.push(SqlParam::Float(min));
        }
        if let Some(max) = max {
            predicates.push(format!("{} > ?", col));
            params.push(SqlParam::Float(max));
        }

        let violations = if predicates.is_empty() {
            "0".to_string()
        } else {
            format!(
                "COALESCE(SUM(CASE WHEN {} THEN 1 ELSE 0 END), 0)",
                predicates.join(" OR ")
            )
        };

        Self {
            sql: format!(
                "SELECT COUNT(*) AS total, {} AS violations FROM {}",
                violations,
                table.quoted()
            ),
            params,
        }
    }

    /// A user supplied query. Only a single read-only SELECT is accepted.
    pub fn read_only(sql: &str) -> Result<Self, DomainError> {
        let dialect = GenericDialect {};
        let statements = Parser::parse_sql(&dialect, sql)
            .map_err(|e| DomainError::RejectedQuery(e.to_string()))?;

        match statements.as_slice() {
            [Statement::Query(_)] => Ok(Self {
                sql: sql.trim().trim_end_matches(';').to_string(),
                params: Vec::new(),
            }),
            [] => Err(DomainError::RejectedQuery("empty query".into())),
            [_] => Err(DomainError::RejectedQuery(
                "only SELECT statements are allowed".into(),
            )),
            _ => Err(DomainError::RejectedQuery(format!(
                "expected one statement, found {}",
                statements.len()
            ))),
        }
    }
}
