// custodian-core/src/domain/governance/alerts.rs
//
// Alerts are derived on every summary; nothing is stored or acknowledged.

use serde::{Deserialize, Serialize};

const QUALITY_WARNING_BELOW: u8 = 80;
const CONSENT_INFO_BELOW: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub level: AlertLevel,
    pub message: String,
}

pub fn derive_alerts(critical_failures: usize, quality_score: u8, consent_coverage: u8) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if critical_failures > 0 {
        alerts.push(Alert {
            level: AlertLevel::Critical,
            message: format!(
                "{} critical data quality rule(s) failing",
                critical_failures
            ),
        });
    }
    if quality_score < QUALITY_WARNING_BELOW {
        alerts.push(Alert {
            level: AlertLevel::Warning,
            message: format!(
                "Data quality score is {}% (below {}%)",
                quality_score, QUALITY_WARNING_BELOW
            ),
        });
    }
    if consent_coverage < CONSENT_INFO_BELOW {
        alerts.push(Alert {
            level: AlertLevel::Info,
            message: format!(
                "Consent coverage is {}% (below {}%)",
                consent_coverage, CONSENT_INFO_BELOW
            ),
        });
    }

    alerts
}
