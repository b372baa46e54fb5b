// custodian-core/src/domain/compliance/records.rs
//
// Platform compliance records. The core only counts them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConsent {
    pub user_id: String,
    pub consent_type: String,
    pub granted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitiveAccessLog {
    pub user_id: String,
    #[serde(default)]
    pub dataset_id: Option<String>,
    /// VIEW, EXPORT, MODIFY, ...
    pub action: String,
    pub accessed_at: DateTime<Utc>,
}
