// custodian/src/commands/seed.rs
//
// USE CASE: Load a catalog snapshot into the governance database.

use anyhow::Context;
use std::path::PathBuf;

use custodian_core::infrastructure::config::load_snapshot;

use super::open_workspace;

pub fn execute(file: PathBuf, project_dir: PathBuf) -> anyhow::Result<()> {
    let workspace = open_workspace(&project_dir)?;

    println!("🌱 Loading snapshot {}...", file.display());
    let snapshot = load_snapshot(&file).with_context(|| format!("Invalid snapshot {:?}", file))?;
    let report = workspace.store.load_snapshot(&snapshot)?;

    println!("   Datasets: {}", report.datasets);
    println!("   Lineage:  {} nodes, {} edges", report.nodes, report.edges);
    println!("   Rules:    {}", report.rules);
    println!("\n✅ Snapshot loaded.");
    Ok(())
}
