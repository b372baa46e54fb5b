// custodian-core/src/domain/governance/mod.rs

pub mod alerts;
pub mod health;

pub use alerts::{Alert, AlertLevel, derive_alerts};
pub use health::{HealthInputs, ScoreBreakdown, percentage};
