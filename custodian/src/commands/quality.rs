// custodian/src/commands/quality.rs
//
// USE CASE: GetQuality (rules + latest results + critical failures).

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use std::path::PathBuf;

use custodian_core::application::{QualityQuery, QualityService};
use custodian_core::domain::quality::{RuleType, Severity};

use super::open_workspace;

pub async fn execute(
    project_dir: PathBuf,
    dataset: Option<String>,
    rule_type: Option<RuleType>,
    severity: Option<Severity>,
    include_results: bool,
    limit: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let workspace = open_workspace(&project_dir)?;
    let service = QualityService::new(
        &workspace.store,
        &workspace.store,
        workspace.config.quality.clone(),
    );

    let query = QualityQuery {
        dataset_id: dataset,
        rule_type,
        severity,
        include_results,
        limit,
    };
    let report = service.get_quality(&query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Rule", "Dataset", "Type", "Field", "Severity", "Latest", "Failures"]);

    for entry in &report.rules {
        let (latest, failures) = match &entry.latest_result {
            Some(result) => (result.status.to_string(), result.failures_found.to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        table.add_row(vec![
            entry.rule.id.clone(),
            entry.rule.dataset_id.clone(),
            entry.rule.rule_type.to_string(),
            entry.rule.field_name.clone().unwrap_or_default(),
            entry.rule.severity.to_string(),
            latest,
            failures,
        ]);
    }

    println!("{table}");

    let summary = &report.summary.summary;
    println!(
        "\n📊 Quality score: {}% ({} passed, {} failed, {} errors)",
        summary.quality_score, summary.tally.passed, summary.tally.failed, summary.tally.errors
    );
    for failure in &report.summary.critical_failures {
        println!(
            "   🚨 {} on {} ({}): {} failures",
            failure.rule_id, failure.dataset_id, failure.rule_type, failure.failures_found
        );
    }

    Ok(())
}
