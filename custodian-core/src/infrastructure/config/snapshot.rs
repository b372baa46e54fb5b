// custodian-core/src/infrastructure/config/snapshot.rs
//
// A catalog snapshot: everything catalog scanning and governance administration
// would normally write, in one YAML document. Used to seed a store.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::domain::catalog::{DataOwner, Dataset, DatasetField, GlossaryTerm};
use crate::domain::compliance::{SensitiveAccessLog, UserConsent};
use crate::domain::lineage::{LineageEdge, LineageNode};
use crate::domain::quality::DataQualityRule;
use crate::infrastructure::error::InfrastructureError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogSnapshot {
    pub datasets: Vec<Dataset>,
    pub fields: Vec<DatasetField>,
    pub owners: Vec<DataOwner>,
    pub glossary: Vec<GlossaryTerm>,
    pub nodes: Vec<LineageNode>,
    pub edges: Vec<LineageEdge>,
    pub rules: Vec<DataQualityRule>,
    pub users: Vec<String>,
    pub consents: Vec<UserConsent>,
    pub access_logs: Vec<SensitiveAccessLog>,
}

impl CatalogSnapshot {
    /// Referential checks a relational store would enforce with foreign keys.
    pub fn check_integrity(&self) -> Result<(), InfrastructureError> {
        let mut names = HashSet::new();
        for dataset in &self.datasets {
            if !names.insert(dataset.name.as_str()) {
                return Err(InfrastructureError::ConfigError(format!(
                    "Dataset name '{}' is not unique",
                    dataset.name
                )));
            }
        }

        let dataset_ids: HashSet<&str> = self.datasets.iter().map(|d| d.id.as_str()).collect();
        let node_ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();

        for field in &self.fields {
            if !dataset_ids.contains(field.dataset_id.as_str()) {
                return Err(InfrastructureError::ConfigError(format!(
                    "Field '{}' references unknown dataset '{}'",
                    field.field_name, field.dataset_id
                )));
            }
        }
        for edge in &self.edges {
            for end in [&edge.source_node_id, &edge.target_node_id] {
                if !node_ids.contains(end.as_str()) {
                    return Err(InfrastructureError::ConfigError(format!(
                        "Edge '{}' references unknown node '{}'",
                        edge.id, end
                    )));
                }
            }
        }
        for rule in &self.rules {
            if !dataset_ids.contains(rule.dataset_id.as_str()) {
                return Err(InfrastructureError::ConfigError(format!(
                    "Rule '{}' references unknown dataset '{}'",
                    rule.id, rule.dataset_id
                )));
            }
        }
        Ok(())
    }
}

pub fn load_snapshot(path: &Path) -> Result<CatalogSnapshot, InfrastructureError> {
    if !path.exists() {
        return Err(InfrastructureError::ConfigNotFound(
            path.display().to_string(),
        ));
    }
    let content = fs::read_to_string(path)?;
    let snapshot: CatalogSnapshot = serde_yaml::from_str(&content)?;
    snapshot.check_integrity()?;
    Ok(snapshot)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::catalog::Sensitivity;
    use crate::domain::lineage::NodeType;
    use crate::domain::quality::RuleType;
    use anyhow::Result;

    const SNAPSHOT: &str = r#"
datasets:
  - id: ds-screening
    name: Screening
    sensitivity: PHI
    domain: clinical
    ownerTeam: research
fields:
  - datasetId: ds-screening
    fieldName: score
    dataType: INTEGER
nodes:
  - id: db:Screening
    name: Screening
    type: STORE
  - id: api:Screenings
    name: Screenings
    type: PROCESS
    metadata:
      route: /api/screenings
edges:
  - id: e1
    sourceNodeId: db:Screening
    targetNodeId: api:Screenings
    transformationLogic: aggregate per user
rules:
  - id: r-score-null
    datasetId: ds-screening
    fieldName: score
    ruleType: NULL_CHECK
    severity: CRITICAL
users: [u1, u2]
"#;

    #[test]
    fn test_parse_snapshot() -> Result<()> {
        let snapshot: CatalogSnapshot = serde_yaml::from_str(SNAPSHOT)?;
        snapshot.check_integrity()?;

        assert_eq!(snapshot.datasets[0].sensitivity, Sensitivity::Phi);
        assert_eq!(snapshot.nodes[1].node_type, NodeType::Process);
        assert_eq!(snapshot.nodes[1].metadata["route"], "/api/screenings");
        assert_eq!(snapshot.rules[0].rule_type, RuleType::NullCheck);
        assert!(snapshot.rules[0].is_active);
        assert_eq!(snapshot.users.len(), 2);
        assert!(snapshot.owners.is_empty());
        Ok(())
    }

    #[test]
    fn test_dangling_edge_is_rejected() -> Result<()> {
        let mut snapshot: CatalogSnapshot = serde_yaml::from_str(SNAPSHOT)?;
        snapshot
            .edges
            .push(LineageEdge::new("e2", "db:Screening", "export:Missing"));
        assert!(snapshot.check_integrity().is_err());
        Ok(())
    }

    #[test]
    fn test_duplicate_dataset_name_is_rejected() -> Result<()> {
        let mut snapshot: CatalogSnapshot = serde_yaml::from_str(SNAPSHOT)?;
        let mut copy = snapshot.datasets[0].clone();
        copy.id = "ds-other".into();
        snapshot.datasets.push(copy);
        assert!(snapshot.check_integrity().is_err());
        Ok(())
    }
}
