// custodian/src/commands/lineage.rs
//
// USE CASE: GetLineage (whole graph, or one node with impact analysis).

use std::path::PathBuf;

use custodian_core::application::{
    LineageDirection, LineageFormat, LineageQuery, LineageResponse, LineageService,
};
use custodian_core::domain::lineage::NodeType;

use super::open_workspace;

pub async fn execute(
    project_dir: PathBuf,
    node: Option<String>,
    direction: LineageDirection,
    depth: Option<u32>,
    node_type: Option<NodeType>,
    format: LineageFormat,
) -> anyhow::Result<()> {
    let workspace = open_workspace(&project_dir)?;
    let service = LineageService::new(&workspace.store, workspace.config.lineage.clone());

    let query = LineageQuery {
        node_id: node,
        direction,
        depth,
        type_filter: node_type,
        format,
    };

    match service.get_lineage(&query).await? {
        LineageResponse::Mermaid(chart) => {
            println!("```mermaid");
            println!("{}", chart);
            println!("```");
        }
        response => println!("{}", serde_json::to_string_pretty(&response)?),
    }

    Ok(())
}
