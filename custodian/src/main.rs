// custodian/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG=debug custodian run ... for the details. Logs go to stderr so
    // that --json output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            project_dir,
            name,
            force,
        } => commands::init::execute(project_dir, name, force),

        Commands::Seed { file, project_dir } => commands::seed::execute(file, project_dir),

        Commands::Lineage {
            project_dir,
            node,
            direction,
            depth,
            node_type,
            format,
        } => commands::lineage::execute(project_dir, node, direction, depth, node_type, format).await,

        Commands::Quality {
            project_dir,
            dataset,
            rule_type,
            severity,
            include_results,
            limit,
            json,
        } => {
            commands::quality::execute(
                project_dir,
                dataset,
                rule_type,
                severity,
                include_results,
                limit,
                json,
            )
            .await
        }

        Commands::Run {
            project_dir,
            dataset,
            rules,
            json,
        } => commands::run::execute(project_dir, dataset, rules, json).await,

        Commands::Summary {
            project_dir,
            output,
            json,
        } => commands::summary::execute(project_dir, output, json).await,
    }
}
