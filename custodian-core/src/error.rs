// custodian-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CustodianError {
    // --- DOMAIN ERRORS (unknown nodes, aggregation faults) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE ERRORS (database, IO, parsing) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- GENERIC / APPLICATION ERRORS ---
    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl CustodianError {
    /// True when the error means "the requested thing does not exist" (404-equivalent).
    pub fn is_not_found(&self) -> bool {
        matches!(self, CustodianError::Domain(DomainError::NodeNotFound(_)))
    }
}

// Manual implementation to avoid duplicate enum variant but keep ergonomics
impl From<std::io::Error> for CustodianError {
    fn from(err: std::io::Error) -> Self {
        CustodianError::Infrastructure(InfrastructureError::Io(err))
    }
}

impl From<duckdb::Error> for CustodianError {
    fn from(err: duckdb::Error) -> Self {
        CustodianError::Infrastructure(InfrastructureError::from(err))
    }
}
