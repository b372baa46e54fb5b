// custodian-core/src/domain/lineage/traversal.rs
//
// Reachability over the lineage graph. Lineage graphs are not guaranteed to be
// acyclic (PROCESS <-> STORE feedback loops are common), so every walk keeps a
// visited set and never expands a node twice.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, instrument, warn};

use crate::domain::error::DomainError;
use crate::domain::lineage::node::{Namespace, NodeSummary, NodeType};
use crate::error::CustodianError;
use crate::ports::store::GovernanceStore;

/// Upper bound of the caller-facing depth contract.
pub const MAX_DEPTH: u32 = 10;
/// Depth used by impact analysis.
pub const IMPACT_DEPTH: u32 = 10;

/// Clamps a requested depth into `[1, MAX_DEPTH]`.
pub fn clamp_depth(depth: u32) -> u32 {
    depth.clamp(1, MAX_DEPTH)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// target -> source
    Upstream,
    /// source -> target
    Downstream,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactReport {
    pub affected_apis: Vec<NodeSummary>,
    pub affected_components: Vec<NodeSummary>,
    pub affected_exports: Vec<NodeSummary>,
}

impl ImpactReport {
    /// Buckets downstream nodes by id namespace and declared type.
    pub fn classify(nodes: &[NodeSummary]) -> Self {
        let mut report = Self::default();
        for node in nodes {
            match (Namespace::of(&node.id), node.node_type) {
                (Some(Namespace::Api), NodeType::Process) => report.affected_apis.push(node.clone()),
                (Some(Namespace::Component), NodeType::Report) => {
                    report.affected_components.push(node.clone())
                }
                (Some(Namespace::Export), NodeType::Report) => {
                    report.affected_exports.push(node.clone())
                }
                _ => {}
            }
        }
        report
    }

    pub fn total(&self) -> usize {
        self.affected_apis.len() + self.affected_components.len() + self.affected_exports.len()
    }
}

pub struct LineageTraversal<'a> {
    store: &'a dyn GovernanceStore,
}

impl<'a> LineageTraversal<'a> {
    pub fn new(store: &'a dyn GovernanceStore) -> Self {
        Self { store }
    }

    /// Nodes feeding `node_id`, up to `max_depth` hops.
    pub async fn upstream(&self, node_id: &str, max_depth: u32) -> Result<Vec<NodeSummary>, CustodianError> {
        self.traverse(node_id, max_depth, Direction::Upstream).await
    }

    /// Nodes fed by `node_id`, up to `max_depth` hops.
    pub async fn downstream(&self, node_id: &str, max_depth: u32) -> Result<Vec<NodeSummary>, CustodianError> {
        self.traverse(node_id, max_depth, Direction::Downstream).await
    }

    /// APIs, UI components and exports reachable downstream of `node_id`.
    pub async fn impact(&self, node_id: &str) -> Result<ImpactReport, CustodianError> {
        let reached = self.downstream(node_id, IMPACT_DEPTH).await?;
        Ok(ImpactReport::classify(&reached))
    }

    /// Breadth-first walk with an explicit frontier. Each node is reported at
    /// most once, in discovery order; the start node is never reported.
    #[instrument(skip(self))]
    async fn traverse(
        &self,
        start: &str,
        max_depth: u32,
        direction: Direction,
    ) -> Result<Vec<NodeSummary>, CustodianError> {
        if self.store.find_node(start).await?.is_none() {
            return Err(DomainError::NodeNotFound(start.to_string()).into());
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut result = Vec::new();
        let mut queue: VecDeque<(String, u32)> = VecDeque::new();

        visited.insert(start.to_string());
        queue.push_back((start.to_string(), 0));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }

            let edges = match direction {
                Direction::Upstream => self.store.find_edges_to(&current).await?,
                Direction::Downstream => self.store.find_edges_from(&current).await?,
            };

            for edge in edges {
                let next = match direction {
                    Direction::Upstream => edge.source_node_id,
                    Direction::Downstream => edge.target_node_id,
                };

                if !visited.insert(next.clone()) {
                    continue;
                }

                match self.store.find_node(&next).await? {
                    Some(node) => {
                        result.push(node.summary());
                        queue.push_back((next, depth + 1));
                    }
                    None => warn!(edge = %edge.id, node = %next, "Edge references unknown node, skipping"),
                }
            }
        }

        debug!(reached = result.len(), "Traversal finished");
        Ok(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::lineage::node::{LineageEdge, LineageNode};
    use crate::infrastructure::adapters::memory::InMemoryStore;
    use anyhow::Result;

    fn ids(nodes: &[NodeSummary]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    async fn pipeline_store() -> InMemoryStore {
        // db:Raw -> api:Ingest -> db:Processed -> component:Dashboard
        let store = InMemoryStore::new();
        store
            .add_nodes(vec![
                LineageNode::new("db:Raw", "Raw", NodeType::Store),
                LineageNode::new("api:Ingest", "Ingest", NodeType::Process),
                LineageNode::new("db:Processed", "Processed", NodeType::Store),
                LineageNode::new("component:Dashboard", "Dashboard", NodeType::Report),
            ])
            .await;
        store
            .add_edges(vec![
                LineageEdge::new("e1", "db:Raw", "api:Ingest"),
                LineageEdge::new("e2", "api:Ingest", "db:Processed").with_transformation("normalize"),
                LineageEdge::new("e3", "db:Processed", "component:Dashboard"),
            ])
            .await;
        store
    }

    async fn two_cycle_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .add_nodes(vec![
                LineageNode::new("db:A", "A", NodeType::Store),
                LineageNode::new("api:B", "B", NodeType::Process),
            ])
            .await;
        store
            .add_edges(vec![
                LineageEdge::new("ab", "db:A", "api:B"),
                LineageEdge::new("ba", "api:B", "db:A"),
            ])
            .await;
        store
    }

    #[tokio::test]
    async fn test_downstream_respects_depth() -> Result<()> {
        let store = pipeline_store().await;
        let t = LineageTraversal::new(&store);

        assert!(t.downstream("db:Raw", 0).await?.is_empty());
        assert_eq!(ids(&t.downstream("db:Raw", 1).await?), vec!["api:Ingest"]);
        assert_eq!(
            ids(&t.downstream("db:Raw", 3).await?),
            vec!["api:Ingest", "db:Processed", "component:Dashboard"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_downstream_grows_monotonically_with_depth() -> Result<()> {
        let store = pipeline_store().await;
        let t = LineageTraversal::new(&store);

        for depth in 1..=MAX_DEPTH {
            let shallow = t.downstream("db:Raw", depth - 1).await?;
            let deep = t.downstream("db:Raw", depth).await?;
            for node in &shallow {
                assert!(deep.contains(node), "depth {} lost {}", depth, node.id);
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_upstream_follows_edges_backward() -> Result<()> {
        let store = pipeline_store().await;
        let t = LineageTraversal::new(&store);

        let up = t.upstream("component:Dashboard", 10).await?;
        assert_eq!(ids(&up), vec!["db:Processed", "api:Ingest", "db:Raw"]);
        assert!(t.upstream("db:Raw", 10).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_two_node_cycle_terminates_without_duplicates() -> Result<()> {
        let store = two_cycle_store().await;
        let t = LineageTraversal::new(&store);

        let down = t.downstream("db:A", 5).await?;
        let up = t.upstream("db:A", 5).await?;
        assert_eq!(ids(&down), vec!["api:B"]);
        assert_eq!(ids(&up), vec!["api:B"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_larger_cycle_reports_each_node_once() -> Result<()> {
        let store = InMemoryStore::new();
        let names = ["db:N0", "db:N1", "db:N2", "db:N3"];
        store
            .add_nodes(names.iter().map(|id| LineageNode::new(*id, *id, NodeType::Store)).collect())
            .await;
        let mut edges = Vec::new();
        for (i, from) in names.iter().enumerate() {
            for (j, to) in names.iter().enumerate() {
                if i != j {
                    edges.push(LineageEdge::new(format!("e{}{}", i, j), *from, *to));
                }
            }
        }
        // parallel edge between the same pair
        edges.push(LineageEdge::new("dup", "db:N0", "db:N1").with_transformation("second path"));
        store.add_edges(edges).await;

        let t = LineageTraversal::new(&store);
        let reached = t.downstream("db:N0", 10).await?;
        let unique: HashSet<&str> = ids(&reached).into_iter().collect();
        assert_eq!(reached.len(), 3);
        assert_eq!(unique.len(), 3);
        assert!(!unique.contains("db:N0"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_node_is_not_found() {
        let store = pipeline_store().await;
        let t = LineageTraversal::new(&store);

        let err = t.downstream("db:Missing", 3).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(t.impact("db:Missing").await.is_err());
    }

    #[tokio::test]
    async fn test_dangling_edge_is_skipped() -> Result<()> {
        let store = pipeline_store().await;
        store
            .add_edges(vec![LineageEdge::new("ghost", "db:Raw", "export:Ghost")])
            .await;
        let t = LineageTraversal::new(&store);

        let down = t.downstream("db:Raw", 1).await?;
        assert_eq!(ids(&down), vec!["api:Ingest"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_impact_classifies_dashboard_as_component() -> Result<()> {
        let store = pipeline_store().await;
        let t = LineageTraversal::new(&store);

        let impact = t.impact("db:Raw").await?;
        assert_eq!(ids(&impact.affected_apis), vec!["api:Ingest"]);
        assert_eq!(ids(&impact.affected_components), vec!["component:Dashboard"]);
        assert!(impact.affected_exports.is_empty());
        assert_eq!(impact.total(), 2);
        Ok(())
    }

    #[test]
    fn test_classify_requires_matching_type() {
        let nodes = vec![
            NodeSummary {
                id: "api:Mislabeled".into(),
                name: "Mislabeled".into(),
                node_type: NodeType::Store,
            },
            NodeSummary {
                id: "export:Monthly".into(),
                name: "Monthly".into(),
                node_type: NodeType::Report,
            },
        ];
        let report = ImpactReport::classify(&nodes);
        assert!(report.affected_apis.is_empty());
        assert_eq!(report.affected_exports.len(), 1);
    }

    #[test]
    fn test_clamp_depth() {
        assert_eq!(clamp_depth(0), 1);
        assert_eq!(clamp_depth(3), 3);
        assert_eq!(clamp_depth(42), MAX_DEPTH);
    }
}
