// custodian-core/src/infrastructure/config/project.rs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};
use validator::Validate;

use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;

const CONFIG_CANDIDATES: [&str; 2] = ["custodian.yaml", "custodian_conf.yaml"];

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct CustodianConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_profile")]
    pub profile: String,

    /// DuckDB file, relative to the project directory, or ":memory:".
    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default)]
    #[validate(nested)]
    pub lineage: LineageSettings,

    #[serde(default)]
    #[validate(nested)]
    pub quality: QualitySettings,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct LineageSettings {
    #[serde(default = "default_depth")]
    #[validate(range(min = 1, max = 10))]
    pub default_depth: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct QualitySettings {
    /// Rules evaluated at the same time. 1 = sequential.
    #[serde(default = "default_concurrency")]
    #[validate(range(min = 1, max = 64))]
    pub concurrency: usize,

    /// Per-rule budget; a rule exceeding it is recorded as ERROR.
    #[serde(default = "default_rule_timeout_ms")]
    #[validate(range(min = 1))]
    pub rule_timeout_ms: u64,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1))]
    pub default_limit: usize,
}

impl QualitySettings {
    pub fn rule_timeout(&self) -> Duration {
        Duration::from_millis(self.rule_timeout_ms)
    }
}

fn default_name() -> String {
    "custodian".to_string()
}
fn default_profile() -> String {
    "dev".to_string()
}
fn default_database() -> String {
    "custodian.duckdb".to_string()
}
fn default_depth() -> u32 {
    3
}
fn default_concurrency() -> usize {
    1
}
fn default_rule_timeout_ms() -> u64 {
    30_000
}
fn default_limit() -> usize {
    100
}

impl Default for LineageSettings {
    fn default() -> Self {
        Self {
            default_depth: default_depth(),
        }
    }
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            rule_timeout_ms: default_rule_timeout_ms(),
            default_limit: default_limit(),
        }
    }
}

impl Default for CustodianConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            profile: default_profile(),
            database: default_database(),
            lineage: LineageSettings::default(),
            quality: QualitySettings::default(),
        }
    }
}

impl CustodianConfig {
    /// Database location resolved against the project directory.
    pub fn database_path(&self, project_dir: &Path) -> String {
        if self.database == ":memory:" || Path::new(&self.database).is_absolute() {
            self.database.clone()
        } else {
            project_dir.join(&self.database).to_string_lossy().into_owned()
        }
    }
}

// --- LOADER ---

/// Loads `custodian.yaml` from `project_dir` (defaults when absent), validates
/// it, then layers environment overrides on top.
#[instrument(skip(project_dir))]
pub fn load_config(project_dir: &Path) -> Result<CustodianConfig, InfrastructureError> {
    let mut config = match find_config_file(project_dir) {
        Some(path) => {
            info!(path = ?path, "Loading custodian configuration");
            let content = fs::read_to_string(&path)?;
            serde_yaml::from_str::<CustodianConfig>(&content)?
        }
        None => {
            info!(dir = ?project_dir, "No configuration file found, using defaults");
            CustodianConfig::default()
        }
    };

    // Allows: CUSTODIAN_DATABASE=/tmp/gov.duckdb custodian summary
    apply_env_overrides(&mut config);

    config.validate()?;
    Ok(config)
}

/// Same as `load_config` but the file must exist.
pub fn load_config_file(path: &Path) -> Result<CustodianConfig, InfrastructureError> {
    if !path.exists() {
        return Err(InfrastructureError::ConfigNotFound(
            path.display().to_string(),
        ));
    }
    let content = fs::read_to_string(path)?;
    let mut config: CustodianConfig = serde_yaml::from_str(&content)?;
    apply_env_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

/// Writes `config` as `custodian.yaml` in `project_dir` and returns the path.
pub fn save_config(project_dir: &Path, config: &CustodianConfig) -> Result<PathBuf, InfrastructureError> {
    config.validate()?;
    let path = project_dir.join(CONFIG_CANDIDATES[0]);
    let content = serde_yaml::to_string(config)?;
    atomic_write(&path, content)?;
    info!(path = ?path, "Configuration written");
    Ok(path)
}

fn find_config_file(root: &Path) -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(|name| root.join(name))
        .find(|p| p.exists())
}

fn apply_env_overrides(config: &mut CustodianConfig) {
    if let Ok(val) = std::env::var("CUSTODIAN_DATABASE") {
        info!(old = ?config.database, new = ?val, "Overriding database via ENV");
        config.database = val;
    }
    if let Ok(val) = std::env::var("CUSTODIAN_PROFILE") {
        info!(old = ?config.profile, new = ?val, "Overriding profile via ENV");
        config.profile = val;
    }
}
