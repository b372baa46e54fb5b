// custodian-core/src/application/lineage.rs
//
// USE CASE: GetLineage. Either the whole graph, or one node with its upstream,
// downstream and impact. Both can be rendered as a Mermaid flowchart.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use tracing::instrument;

use crate::domain::error::DomainError;
use crate::domain::lineage::{
    ImpactReport, LineageEdge, LineageNode, LineageTraversal, NodeSummary, NodeType, clamp_depth,
};
use crate::error::CustodianError;
use crate::infrastructure::config::LineageSettings;
use crate::ports::store::GovernanceStore;

// ── Query ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineageDirection {
    Upstream,
    Downstream,
    #[default]
    Both,
}

impl LineageDirection {
    fn wants_upstream(&self) -> bool {
        matches!(self, Self::Upstream | Self::Both)
    }

    fn wants_downstream(&self) -> bool {
        matches!(self, Self::Downstream | Self::Both)
    }
}

impl FromStr for LineageDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "upstream" => Ok(Self::Upstream),
            "downstream" => Ok(Self::Downstream),
            "both" => Ok(Self::Both),
            _ => Err(format!("Unknown direction: {} (expected upstream, downstream or both)", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineageFormat {
    #[default]
    Graph,
    Mermaid,
}

impl FromStr for LineageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "graph" | "json" => Ok(Self::Graph),
            "mermaid" => Ok(Self::Mermaid),
            _ => Err(format!("Unknown lineage format: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LineageQuery {
    pub node_id: Option<String>,
    pub direction: LineageDirection,
    /// Defaults to `lineage.default_depth`; always clamped to [1, 10].
    pub depth: Option<u32>,
    pub type_filter: Option<NodeType>,
    pub format: LineageFormat,
}

// ── Responses ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSummary {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub nodes_by_type: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageGraph {
    pub nodes: Vec<LineageNode>,
    pub edges: Vec<LineageEdge>,
    pub summary: GraphSummary,
}

impl LineageGraph {
    pub fn new(nodes: Vec<LineageNode>, edges: Vec<LineageEdge>) -> Self {
        let mut nodes_by_type = BTreeMap::new();
        for node in &nodes {
            *nodes_by_type.entry(node.node_type.as_str().to_string()).or_insert(0) += 1;
        }
        let summary = GraphSummary {
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            nodes_by_type,
        };
        Self {
            nodes,
            edges,
            summary,
        }
    }

    /// Keeps nodes of `node_type` and the edges running between kept nodes.
    pub fn filtered(self, node_type: NodeType) -> Self {
        let nodes: Vec<LineageNode> = self
            .nodes
            .into_iter()
            .filter(|n| n.node_type == node_type)
            .collect();
        let kept: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        let edges: Vec<LineageEdge> = self
            .edges
            .into_iter()
            .filter(|e| kept.contains(e.source_node_id.as_str()) && kept.contains(e.target_node_id.as_str()))
            .collect();
        Self::new(nodes, edges)
    }

    /// Flowchart rendering. `focus` gets highlighted when present.
    pub fn to_mermaid(&self, focus: Option<&str>) -> String {
        let mut lines = vec!["graph LR".to_string()];
        let ids = mermaid_ids(&self.nodes);

        for node in &self.nodes {
            let Some(id) = ids.get(node.id.as_str()) else {
                continue;
            };
            let label = node.name.replace('"', "#quot;");
            let shape = match node.node_type {
                NodeType::Source => format!("{}([\"{}\"])", id, label),
                NodeType::Process => format!("{}[\"{}\"]", id, label),
                NodeType::Store => format!("{}[(\"{}\")]", id, label),
                NodeType::Report => format!("{}[/\"{}\"/]", id, label),
            };
            lines.push(format!("    {}", shape));
        }

        for edge in &self.edges {
            let (Some(from), Some(to)) = (
                ids.get(edge.source_node_id.as_str()),
                ids.get(edge.target_node_id.as_str()),
            ) else {
                continue;
            };
            match edge.transformation_logic.as_deref() {
                Some(logic) if !logic.is_empty() => lines.push(format!(
                    "    {} -->|\"{}\"| {}",
                    from,
                    logic.replace('"', "#quot;"),
                    to
                )),
                _ => lines.push(format!("    {} --> {}", from, to)),
            }
        }

        if let Some(id) = focus.and_then(|f| ids.get(f)) {
            lines.push(format!("    style {} fill:#f9d66b,stroke:#b7950b", id));
        }

        lines.join("\n")
    }
}

/// Mermaid ids must be bare words: `db:Screening` becomes `db_Screening`.
fn mermaid_ids(nodes: &[LineageNode]) -> HashMap<&str, String> {
    let mut taken = HashSet::new();
    let mut ids = HashMap::new();
    for node in nodes {
        let base: String = node
            .id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let mut candidate = base.clone();
        let mut suffix = 1;
        while !taken.insert(candidate.clone()) {
            suffix += 1;
            candidate = format!("{}_{}", base, suffix);
        }
        ids.insert(node.id.as_str(), candidate);
    }
    ids
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLineage {
    pub node: LineageNode,
    pub upstream: Vec<NodeSummary>,
    pub downstream: Vec<NodeSummary>,
    pub impact: ImpactReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LineageResponse {
    Graph(LineageGraph),
    Node(NodeLineage),
    Mermaid(String),
}

// ── Service ──────────────────────────────────────────────────────────

pub struct LineageService<'a> {
    store: &'a dyn GovernanceStore,
    settings: LineageSettings,
}

impl<'a> LineageService<'a> {
    pub fn new(store: &'a dyn GovernanceStore, settings: LineageSettings) -> Self {
        Self { store, settings }
    }

    #[instrument(skip(self))]
    pub async fn get_lineage(&self, query: &LineageQuery) -> Result<LineageResponse, CustodianError> {
        let Some(node_id) = query.node_id.as_deref() else {
            let graph = self.full_graph(query.type_filter).await?;
            return Ok(match query.format {
                LineageFormat::Graph => LineageResponse::Graph(graph),
                LineageFormat::Mermaid => LineageResponse::Mermaid(graph.to_mermaid(None)),
            });
        };

        let lineage = self.node_lineage(node_id, query).await?;
        Ok(match query.format {
            LineageFormat::Graph => LineageResponse::Node(lineage),
            LineageFormat::Mermaid => {
                let subgraph = self.subgraph_of(&lineage).await?;
                LineageResponse::Mermaid(subgraph.to_mermaid(Some(node_id)))
            }
        })
    }

    async fn full_graph(&self, type_filter: Option<NodeType>) -> Result<LineageGraph, CustodianError> {
        let graph = LineageGraph::new(self.store.list_nodes().await?, self.store.list_edges().await?);
        Ok(match type_filter {
            Some(node_type) => graph.filtered(node_type),
            None => graph,
        })
    }

    async fn node_lineage(&self, node_id: &str, query: &LineageQuery) -> Result<NodeLineage, CustodianError> {
        let node = self
            .store
            .find_node(node_id)
            .await?
            .ok_or_else(|| DomainError::NodeNotFound(node_id.to_string()))?;

        let depth = clamp_depth(query.depth.unwrap_or(self.settings.default_depth));
        let traversal = LineageTraversal::new(self.store);

        let mut upstream = if query.direction.wants_upstream() {
            traversal.upstream(node_id, depth).await?
        } else {
            Vec::new()
        };
        let mut downstream = if query.direction.wants_downstream() {
            traversal.downstream(node_id, depth).await?
        } else {
            Vec::new()
        };
        let impact = traversal.impact(node_id).await?;

        if let Some(node_type) = query.type_filter {
            upstream.retain(|n| n.node_type == node_type);
            downstream.retain(|n| n.node_type == node_type);
        }

        Ok(NodeLineage {
            node,
            upstream,
            downstream,
            impact,
        })
    }

    /// The focus node, everything it reached, and the edges among them.
    async fn subgraph_of(&self, lineage: &NodeLineage) -> Result<LineageGraph, CustodianError> {
        let mut wanted: HashSet<&str> = HashSet::new();
        wanted.insert(lineage.node.id.as_str());
        wanted.extend(lineage.upstream.iter().map(|n| n.id.as_str()));
        wanted.extend(lineage.downstream.iter().map(|n| n.id.as_str()));

        let nodes: Vec<LineageNode> = self
            .store
            .list_nodes()
            .await?
            .into_iter()
            .filter(|n| wanted.contains(n.id.as_str()))
            .collect();
        let edges: Vec<LineageEdge> = self
            .store
            .list_edges()
            .await?
            .into_iter()
            .filter(|e| wanted.contains(e.source_node_id.as_str()) && wanted.contains(e.target_node_id.as_str()))
            .collect();
        Ok(LineageGraph::new(nodes, edges))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::memory::InMemoryStore;
    use anyhow::Result;

    async fn store() -> InMemoryStore {
        // db:Raw -> api:Ingest -> db:Processed -> component:Dashboard
        //                                     \-> export:Monthly
        let store = InMemoryStore::new();
        store
            .add_nodes(vec![
                LineageNode::new("db:Raw", "Raw", NodeType::Store),
                LineageNode::new("api:Ingest", "Ingest", NodeType::Process),
                LineageNode::new("db:Processed", "Processed", NodeType::Store),
                LineageNode::new("component:Dashboard", "Dashboard", NodeType::Report),
                LineageNode::new("export:Monthly", "Monthly \"CSV\"", NodeType::Report),
            ])
            .await;
        store
            .add_edges(vec![
                LineageEdge::new("e1", "db:Raw", "api:Ingest"),
                LineageEdge::new("e2", "api:Ingest", "db:Processed").with_transformation("normalize"),
                LineageEdge::new("e3", "db:Processed", "component:Dashboard"),
                LineageEdge::new("e4", "db:Processed", "export:Monthly"),
            ])
            .await;
        store
    }

    fn ids(nodes: &[NodeSummary]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_full_graph_with_summary() -> Result<()> {
        let store = store().await;
        let service = LineageService::new(&store, LineageSettings::default());

        let LineageResponse::Graph(graph) = service.get_lineage(&LineageQuery::default()).await? else {
            panic!("expected a graph");
        };
        assert_eq!(graph.summary.total_nodes, 5);
        assert_eq!(graph.summary.total_edges, 4);
        assert_eq!(graph.summary.nodes_by_type["REPORT"], 2);

        let json = serde_json::to_value(&graph)?;
        assert_eq!(json["summary"]["totalNodes"], 5);
        assert_eq!(json["summary"]["nodesByType"]["STORE"], 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_type_filter_drops_dangling_edges() -> Result<()> {
        let store = store().await;
        let service = LineageService::new(&store, LineageSettings::default());

        let query = LineageQuery {
            type_filter: Some(NodeType::Store),
            ..LineageQuery::default()
        };
        let LineageResponse::Graph(graph) = service.get_lineage(&query).await? else {
            panic!("expected a graph");
        };
        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.edges.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_node_view_both_directions() -> Result<()> {
        let store = store().await;
        let service = LineageService::new(&store, LineageSettings::default());

        let query = LineageQuery {
            node_id: Some("db:Processed".into()),
            ..LineageQuery::default()
        };
        let LineageResponse::Node(view) = service.get_lineage(&query).await? else {
            panic!("expected a node view");
        };
        assert_eq!(view.node.id, "db:Processed");
        assert_eq!(ids(&view.upstream), vec!["api:Ingest", "db:Raw"]);
        assert_eq!(ids(&view.downstream), vec!["component:Dashboard", "export:Monthly"]);
        assert_eq!(view.impact.affected_components.len(), 1);
        assert_eq!(view.impact.affected_exports.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_omitted_direction_is_empty_and_depth_clamped() -> Result<()> {
        let store = store().await;
        let service = LineageService::new(&store, LineageSettings::default());

        let query = LineageQuery {
            node_id: Some("db:Raw".into()),
            direction: LineageDirection::Downstream,
            depth: Some(0),
            ..LineageQuery::default()
        };
        let LineageResponse::Node(view) = service.get_lineage(&query).await? else {
            panic!("expected a node view");
        };
        assert!(view.upstream.is_empty());
        // depth 0 is clamped up to 1
        assert_eq!(ids(&view.downstream), vec!["api:Ingest"]);
        // impact always walks the full depth
        assert_eq!(view.impact.total(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_node_is_not_found() -> Result<()> {
        let store = store().await;
        let service = LineageService::new(&store, LineageSettings::default());

        let query = LineageQuery {
            node_id: Some("db:Missing".into()),
            ..LineageQuery::default()
        };
        let err = service.get_lineage(&query).await.unwrap_err();
        assert!(err.is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_mermaid_rendering() -> Result<()> {
        let store = store().await;
        let service = LineageService::new(&store, LineageSettings::default());

        let query = LineageQuery {
            node_id: Some("api:Ingest".into()),
            direction: LineageDirection::Upstream,
            format: LineageFormat::Mermaid,
            ..LineageQuery::default()
        };
        let LineageResponse::Mermaid(chart) = service.get_lineage(&query).await? else {
            panic!("expected mermaid");
        };
        assert!(chart.starts_with("graph LR"));
        assert!(chart.contains("db_Raw[(\"Raw\")]"));
        assert!(chart.contains("db_Raw --> api_Ingest"));
        assert!(chart.contains("style api_Ingest"));
        assert!(!chart.contains("Dashboard"));
        Ok(())
    }

    #[test]
    fn test_mermaid_escapes_labels_and_dedupes_ids() {
        let graph = LineageGraph::new(
            vec![
                LineageNode::new("db:a", "A \"quoted\"", NodeType::Store),
                LineageNode::new("db_a", "Other", NodeType::Source),
            ],
            vec![LineageEdge::new("e", "db:a", "db_a").with_transformation("copy")],
        );
        let chart = graph.to_mermaid(None);
        assert!(chart.contains("db_a[(\"A #quot;quoted#quot;\")]"));
        assert!(chart.contains("db_a_2([\"Other\"])"));
        assert!(chart.contains("db_a -->|\"copy\"| db_a_2"));
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!(LineageDirection::from_str("UPSTREAM"), Ok(LineageDirection::Upstream));
        assert!(LineageDirection::from_str("sideways").is_err());
        assert_eq!(LineageFormat::from_str("json"), Ok(LineageFormat::Graph));
    }
}
