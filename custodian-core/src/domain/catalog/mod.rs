// custodian-core/src/domain/catalog/mod.rs
//
// Catalog records as seen by the governance core. Catalog management lives
// elsewhere: these types are read-only here.

pub mod sensitivity;

pub use sensitivity::Sensitivity;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    /// Physical table name. Unique and stable: rules and `db:` lineage ids reference it.
    pub name: String,
    pub sensitivity: Sensitivity,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub owner_team: Option<String>,
    #[serde(default)]
    pub retention_policy: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Dataset {
    /// Lineage id of the store node backing this dataset.
    pub fn lineage_node_id(&self) -> String {
        format!("db:{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetField {
    pub dataset_id: String,
    pub field_name: String,
    pub data_type: String,
    #[serde(default)]
    pub is_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataOwner {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlossaryTerm {
    pub id: String,
    pub term: String,
    #[serde(default)]
    pub definition: Option<String>,
}
