// custodian-core/src/domain/lineage/mod.rs

pub mod node;
pub mod traversal;

pub use node::{LineageEdge, LineageNode, Namespace, NodeSummary, NodeType};
pub use traversal::{Direction, ImpactReport, LineageTraversal, IMPACT_DEPTH, MAX_DEPTH, clamp_depth};
