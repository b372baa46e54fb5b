// custodian-core/src/ports/mod.rs

pub mod query;
pub mod store;

pub use query::{QueryExecutor, QueryRow};
pub use store::GovernanceStore;
