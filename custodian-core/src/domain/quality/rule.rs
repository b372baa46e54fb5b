// custodian-core/src/domain/quality/rule.rs

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    NullCheck,
    RangeCheck,
    ForeignKey,
    AnomalyDetection,
    CustomSql,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NullCheck => "NULL_CHECK",
            Self::RangeCheck => "RANGE_CHECK",
            Self::ForeignKey => "FOREIGN_KEY",
            Self::AnomalyDetection => "ANOMALY_DETECTION",
            Self::CustomSql => "CUSTOM_SQL",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "NULL_CHECK" => Ok(Self::NullCheck),
            "RANGE_CHECK" => Ok(Self::RangeCheck),
            "FOREIGN_KEY" => Ok(Self::ForeignKey),
            "ANOMALY_DETECTION" => Ok(Self::AnomalyDetection),
            "CUSTOM_SQL" => Ok(Self::CustomSql),
            _ => Err(format!("Unknown rule type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "WARNING" => Ok(Self::Warning),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityRule {
    pub id: String,
    pub dataset_id: String,
    #[serde(default)]
    pub field_name: Option<String>,
    pub rule_type: RuleType,
    /// Rule-type specific parameters, parsed by the matching evaluator.
    #[serde(default = "empty_criteria")]
    pub criteria: serde_json::Value,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn empty_criteria() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_active() -> bool {
    true
}

/// Selection used both by quality runs (`active_only`) and rule listings.
#[derive(Debug, Clone, Default)]
pub struct RuleFilter {
    pub dataset_id: Option<String>,
    pub rule_ids: Option<Vec<String>>,
    pub rule_type: Option<RuleType>,
    pub severity: Option<Severity>,
    pub active_only: bool,
    pub limit: Option<usize>,
}

impl RuleFilter {
    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, rule: &DataQualityRule) -> bool {
        if self.active_only && !rule.is_active {
            return false;
        }
        if let Some(dataset_id) = &self.dataset_id
            && &rule.dataset_id != dataset_id
        {
            return false;
        }
        if let Some(ids) = &self.rule_ids
            && !ids.contains(&rule.id)
        {
            return false;
        }
        if let Some(rule_type) = self.rule_type
            && rule.rule_type != rule_type
        {
            return false;
        }
        if let Some(severity) = self.severity
            && rule.severity != severity
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn rule(id: &str, dataset: &str, active: bool) -> DataQualityRule {
        DataQualityRule {
            id: id.into(),
            dataset_id: dataset.into(),
            field_name: None,
            rule_type: RuleType::NullCheck,
            criteria: empty_criteria(),
            severity: Severity::Warning,
            is_active: active,
            description: None,
        }
    }

    #[test]
    fn test_rule_type_parsing() {
        assert_eq!(RuleType::from_str("custom_sql"), Ok(RuleType::CustomSql));
        assert_eq!(RuleType::from_str("range-check"), Ok(RuleType::RangeCheck));
        assert!(RuleType::from_str("UNIQUE").is_err());
    }

    #[test]
    fn test_rule_deserializes_with_defaults() -> anyhow::Result<()> {
        let rule: DataQualityRule = serde_json::from_str(
            r#"{"id": "r1", "datasetId": "d1", "ruleType": "RANGE_CHECK"}"#,
        )?;
        assert!(rule.is_active);
        assert_eq!(rule.severity, Severity::Warning);
        assert!(rule.criteria.is_object());
        Ok(())
    }

    #[test]
    fn test_filter_matching() {
        let filter = RuleFilter {
            dataset_id: Some("d1".into()),
            ..RuleFilter::active()
        };
        assert!(filter.matches(&rule("r1", "d1", true)));
        assert!(!filter.matches(&rule("r2", "d1", false)));
        assert!(!filter.matches(&rule("r3", "d2", true)));

        let by_id = RuleFilter {
            rule_ids: Some(vec!["r2".into()]),
            ..RuleFilter::default()
        };
        assert!(by_id.matches(&rule("r2", "d1", false)));
        assert!(!by_id.matches(&rule("r1", "d1", true)));
    }
}
