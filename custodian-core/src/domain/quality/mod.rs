// custodian-core/src/domain/quality/mod.rs

pub mod criteria;
pub mod result;
pub mod rule;
pub mod score;

pub use criteria::{AnomalyCriteria, CustomSqlCriteria, NullCheckCriteria, RangeCheckCriteria};
pub use result::{DataQualityResult, NewQualityResult, QualityStatus, RuleOutcome, latest_per_rule};
pub use rule::{DataQualityRule, RuleFilter, RuleType, Severity};
pub use score::{CriticalFailure, QualityTally, critical_failures, quality_score};
