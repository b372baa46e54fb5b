// custodian-core/src/application/mod.rs

pub mod evaluators;
pub mod governance;
pub mod lineage;
pub mod quality;

// --- RE-EXPORTS (FACADE PATTERN) ---
// The CLI only needs `use custodian_core::application::{QualityService, ...}`.

pub use evaluators::{EvaluationError, EvaluatorRegistry, RuleEvaluator};
pub use governance::{GovernanceAggregator, GovernanceSummary};
pub use lineage::{LineageDirection, LineageFormat, LineageQuery, LineageResponse, LineageService};
pub use quality::{QualityQuery, QualityReport, QualityRun, QualityRunFilter, QualityService};
