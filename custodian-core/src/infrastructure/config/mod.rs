// custodian-core/src/infrastructure/config/mod.rs

pub mod project;
pub mod snapshot;

pub use project::{CustodianConfig, LineageSettings, QualitySettings, load_config, load_config_file, save_config};
pub use snapshot::{CatalogSnapshot, load_snapshot};
