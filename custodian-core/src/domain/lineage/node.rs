// custodian-core/src/domain/lineage/node.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeType {
    Source,
    Process,
    Store,
    Report,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "SOURCE",
            Self::Process => "PROCESS",
            Self::Store => "STORE",
            Self::Report => "REPORT",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SOURCE" => Ok(Self::Source),
            "PROCESS" => Ok(Self::Process),
            "STORE" => Ok(Self::Store),
            "REPORT" => Ok(Self::Report),
            _ => Err(format!("Unknown node type: {}", s)),
        }
    }
}

/// Id prefixes used by catalog scanning. Impact analysis classifies nodes by them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Database,
    Api,
    Component,
    Export,
}

impl Namespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Database => "db:",
            Self::Api => "api:",
            Self::Component => "component:",
            Self::Export => "export:",
        }
    }

    pub fn of(node_id: &str) -> Option<Self> {
        [Self::Database, Self::Api, Self::Component, Self::Export]
            .into_iter()
            .find(|ns| node_id.starts_with(ns.prefix()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl LineageNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type,
            metadata: BTreeMap::new(),
        }
    }

    pub fn namespace(&self) -> Option<Namespace> {
        Namespace::of(&self.id)
    }

    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            node_type: self.node_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageEdge {
    pub id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation_logic: Option<String>,
}

impl LineageEdge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_node_id: source.into(),
            target_node_id: target.into(),
            transformation_logic: None,
        }
    }

    pub fn with_transformation(mut self, logic: &str) -> Self {
        self.transformation_logic = Some(logic.to_string());
        self
    }
}

/// What traversals return: `{id, name, type}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_detection() {
        assert_eq!(Namespace::of("db:Screening"), Some(Namespace::Database));
        assert_eq!(Namespace::of("api:Ingest"), Some(Namespace::Api));
        assert_eq!(Namespace::of("component:Dashboard"), Some(Namespace::Component));
        assert_eq!(Namespace::of("export:Monthly"), Some(Namespace::Export));
        assert_eq!(Namespace::of("Dashboard"), None);
    }

    #[test]
    fn test_node_serializes_type_field() -> anyhow::Result<()> {
        let node = LineageNode::new("api:Ingest", "Ingest", NodeType::Process);
        let json = serde_json::to_value(node.summary())?;
        assert_eq!(json["type"], "PROCESS");
        assert_eq!(json["id"], "api:Ingest");
        Ok(())
    }
}
