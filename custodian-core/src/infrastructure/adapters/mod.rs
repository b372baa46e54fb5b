// custodian-core/src/infrastructure/adapters/mod.rs

pub mod duckdb;
pub mod memory;

pub use self::duckdb::DuckDBStore;
pub use memory::InMemoryStore;
