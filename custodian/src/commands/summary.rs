// custodian/src/commands/summary.rs
//
// USE CASE: GetGovernanceSummary.

use anyhow::Context;
use std::path::PathBuf;

use custodian_core::application::GovernanceAggregator;
use custodian_core::domain::governance::AlertLevel;
use custodian_core::infrastructure::fs::write_json_report;

use super::open_workspace;

pub async fn execute(project_dir: PathBuf, output: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let workspace = open_workspace(&project_dir)?;
    let summary = GovernanceAggregator::new(&workspace.store).summarize().await?;

    if let Some(path) = &output {
        write_json_report(path, &summary)
            .with_context(|| format!("Failed to write summary to {:?}", path))?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("🩺 Governance health: {}/100", summary.health_score);
    println!(
        "   Quality {}% | Catalog {}% | Lineage {:.1} | Ownership {}% | Consent {}%",
        summary.scores.quality_score,
        summary.scores.catalog_score,
        summary.scores.lineage_score,
        summary.scores.ownership_score,
        summary.scores.consent_coverage
    );

    println!("\n📚 Catalog");
    println!(
        "   {} datasets, {} fields, {} owners, {} glossary terms",
        summary.catalog.total_datasets,
        summary.catalog.total_fields,
        summary.catalog.total_owners,
        summary.catalog.total_glossary_terms
    );
    for dataset in &summary.catalog.regulated_datasets {
        println!(
            "   🔒 {} [{}] {} fields, owner: {}",
            dataset.name,
            dataset.sensitivity,
            dataset.field_count,
            dataset.owner_team.as_deref().unwrap_or("none")
        );
    }

    println!("\n🔗 Lineage");
    println!(
        "   {} nodes, {} edges, PHI coverage {}%",
        summary.lineage.total_nodes, summary.lineage.total_edges, summary.lineage.phi_lineage_coverage
    );

    println!("\n🛡️  Compliance");
    println!(
        "   {}/{} users consented ({}%), {} sensitive accesses",
        summary.compliance.consented_users,
        summary.compliance.total_users,
        summary.compliance.consent_coverage,
        summary.compliance.sensitive_access_total
    );

    if !summary.alerts.is_empty() {
        println!("\n📣 Alerts");
        for alert in &summary.alerts {
            let icon = match alert.level {
                AlertLevel::Critical => "🚨",
                AlertLevel::Warning => "⚠️ ",
                AlertLevel::Info => "ℹ️ ",
            };
            println!("   {} {}", icon, alert.message);
        }
    }

    if let Some(path) = output {
        println!("\n💾 Summary written to {}", path.display());
    }

    Ok(())
}
