pub mod records;
pub mod zscore;

pub use records::{SensitiveAccessLog, UserConsent};
pub use zscore::{MetricState, ZScoreCheck, ZScoreError};
