// custodian/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use custodian_core::application::{LineageDirection, LineageFormat};
use custodian_core::domain::lineage::NodeType;
use custodian_core::domain::quality::{RuleType, Severity};

#[derive(Parser)]
#[command(name = "custodian")]
#[command(about = "Data Governance Engine: lineage, data quality and health scoring", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🏗️  Creates custodian.yaml and the governance database
    Init {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Project name written to custodian.yaml (default: directory name)
        #[arg(long)]
        name: Option<String>,

        /// Overwrite an existing custodian.yaml
        #[arg(long)]
        force: bool,
    },

    /// 🌱 Loads a catalog snapshot (datasets, lineage, rules...) into the database
    Seed {
        /// Snapshot YAML file
        file: PathBuf,

        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },

    /// 🔗 Lineage graph, or upstream/downstream/impact of one node
    Lineage {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Node id (ex: "db:Screening"). Omit for the whole graph.
        #[arg(long)]
        node: Option<String>,

        /// upstream | downstream | both
        #[arg(long, default_value = "both")]
        direction: LineageDirection,

        /// Traversal depth, clamped to 1..=10 (default: lineage.default_depth)
        #[arg(long)]
        depth: Option<u32>,

        /// Only keep nodes of this type: SOURCE | PROCESS | STORE | REPORT
        #[arg(long = "type")]
        node_type: Option<NodeType>,

        /// Output format: graph (JSON) | mermaid
        #[arg(long, default_value = "graph")]
        format: LineageFormat,
    },

    /// 📋 Lists quality rules with their latest results
    Quality {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        #[arg(long)]
        dataset: Option<String>,

        /// NULL_CHECK | RANGE_CHECK | CUSTOM_SQL | FOREIGN_KEY | ANOMALY_DETECTION
        #[arg(long)]
        rule_type: Option<RuleType>,

        /// WARNING | CRITICAL
        #[arg(long)]
        severity: Option<Severity>,

        /// Attach the 10 most recent results of each rule
        #[arg(long)]
        include_results: bool,

        #[arg(long)]
        limit: Option<usize>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// 🚀 Runs active quality rules and records one result per rule
    Run {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Only rules of this dataset id
        #[arg(long)]
        dataset: Option<String>,

        /// Only these rule ids (repeatable)
        #[arg(long = "rule")]
        rules: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// 🩺 Governance summary: health score, metrics and alerts
    Summary {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Also write the summary as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },
}
