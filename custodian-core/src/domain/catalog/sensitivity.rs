// custodian-core/src/domain/catalog/sensitivity.rs

use serde::{Deserialize, Serialize};
use std::fmt;

// Declaration order doubles as severity order: Public < Internal < Pii < Phi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sensitivity {
    Public,
    #[default]
    Internal,
    Pii,
    Phi,
}

impl Sensitivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Internal => "INTERNAL",
            Self::Pii => "PII",
            Self::Phi => "PHI",
        }
    }

    /// PII and PHI datasets get listed individually in the governance summary.
    pub fn is_regulated(&self) -> bool {
        matches!(self, Self::Pii | Self::Phi)
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Sensitivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PUBLIC" => Ok(Self::Public),
            "INTERNAL" => Ok(Self::Internal),
            "PII" => Ok(Self::Pii),
            "PHI" => Ok(Self::Phi),
            _ => Err(format!("Unknown sensitivity: {}", s)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_sensitivity_ordering() {
        assert!(Sensitivity::Public < Sensitivity::Internal);
        assert!(Sensitivity::Internal < Sensitivity::Pii);
        assert!(Sensitivity::Pii < Sensitivity::Phi);
    }

    #[test]
    fn test_display_and_parsing_consistency() -> anyhow::Result<()> {
        assert_eq!(Sensitivity::Phi.to_string(), "PHI");
        assert_eq!(
            Sensitivity::from_str("pii").map_err(|e| anyhow::anyhow!(e))?,
            Sensitivity::Pii
        );
        assert!(Sensitivity::from_str("secret").is_err());
        Ok(())
    }

    #[test]
    fn test_regulated_levels() {
        assert!(Sensitivity::Phi.is_regulated());
        assert!(Sensitivity::Pii.is_regulated());
        assert!(!Sensitivity::Internal.is_regulated());
    }
}
