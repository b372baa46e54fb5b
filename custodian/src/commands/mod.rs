// custodian/src/commands/mod.rs

pub mod init;
pub mod lineage;
pub mod quality;
pub mod run;
pub mod seed;
pub mod summary;

use anyhow::Context;
use std::path::Path;

use custodian_core::infrastructure::adapters::DuckDBStore;
use custodian_core::infrastructure::config::{CustodianConfig, load_config};

/// Configuration plus the governance database of one project directory.
pub struct Workspace {
    pub config: CustodianConfig,
    pub store: DuckDBStore,
}

/// Opens an initialised project. The database must already exist.
pub fn open_workspace(project_dir: &Path) -> anyhow::Result<Workspace> {
    let config = load_config(project_dir).with_context(|| {
        format!(
            "Failed to load project configuration from {:?}",
            project_dir
        )
    })?;

    let db_path = config.database_path(project_dir);
    if db_path != ":memory:" && !Path::new(&db_path).exists() {
        anyhow::bail!(
            "❌ Database not found at: {}\n👉 Have you run 'custodian init'?",
            db_path
        );
    }

    let store = DuckDBStore::new(&db_path)
        .with_context(|| format!("Failed to open DuckDB at {}", db_path))?;

    Ok(Workspace { config, store })
}
