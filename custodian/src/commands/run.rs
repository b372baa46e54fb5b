// custodian/src/commands/run.rs
//
// USE CASE: RunQualityChecks.

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use std::path::PathBuf;

use custodian_core::application::{QualityRunFilter, QualityService};

use super::open_workspace;

pub async fn execute(
    project_dir: PathBuf,
    dataset: Option<String>,
    rules: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let start = std::time::Instant::now();
    let workspace = open_workspace(&project_dir)?;
    let service = QualityService::new(
        &workspace.store,
        &workspace.store,
        workspace.config.quality.clone(),
    );

    let filter = QualityRunFilter {
        dataset_id: dataset,
        rule_ids: if rules.is_empty() { None } else { Some(rules) },
    };

    if !json {
        println!("🚀 Running quality checks...");
    }
    let run = service.run_quality_checks(&filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Rule", "Status", "Checked", "Failures", "Duration", "Message"]);

    for result in &run.results {
        table.add_row(vec![
            result.rule_id.clone(),
            result.status.to_string(),
            result.records_checked.to_string(),
            result.failures_found.to_string(),
            format!("{} ms", result.execution_duration_ms),
            result.message.clone().unwrap_or_default(),
        ]);
    }

    println!("{table}");

    let summary = &run.summary;
    println!(
        "\n✨ {} rules in {:.2?}: {} passed, {} failed, {} errors (score {}%)",
        summary.tally.total_rules,
        start.elapsed(),
        summary.tally.passed,
        summary.tally.failed,
        summary.tally.errors,
        summary.quality_score
    );

    Ok(())
}
