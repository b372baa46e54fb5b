// custodian/src/commands/init.rs
//
// USE CASE: Initialise a governance project (config file + database schema).

use anyhow::Context;
use std::path::PathBuf;

use custodian_core::infrastructure::adapters::DuckDBStore;
use custodian_core::infrastructure::config::{CustodianConfig, load_config, save_config};

pub fn execute(project_dir: PathBuf, name: Option<String>, force: bool) -> anyhow::Result<()> {
    std::fs::create_dir_all(&project_dir)
        .with_context(|| format!("Cannot create project directory {:?}", project_dir))?;

    let config_path = project_dir.join("custodian.yaml");
    let config = if config_path.exists() && !force {
        println!("⚙️  Keeping existing {}", config_path.display());
        load_config(&project_dir)?
    } else {
        let name = name.unwrap_or_else(|| {
            project_dir
                .canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "custodian".to_string())
        });
        let config = CustodianConfig {
            name,
            ..CustodianConfig::default()
        };
        let written = save_config(&project_dir, &config)?;
        println!("📝 Wrote {}", written.display());
        config
    };

    let db_path = config.database_path(&project_dir);
    DuckDBStore::new(&db_path).with_context(|| format!("Failed to initialize DuckDB at {}", db_path))?;
    println!("🦆 Governance database ready at {}", db_path);
    println!("\n✨ Project '{}' initialised. Next: custodian seed <snapshot.yaml>", config.name);

    Ok(())
}
