pub mod catalog;
pub mod compliance;
pub mod error;
pub mod governance;
pub mod lineage;
pub mod quality;
pub mod sql;

// Handy re-exports to keep imports short elsewhere
pub use error::DomainError;
