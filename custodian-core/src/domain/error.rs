// custodian-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Lineage node '{0}' not found")]
    #[diagnostic(
        code(custodian::domain::node_not_found),
        help("Node ids are namespaced: db:<Table>, api:<Route>, component:<Name>, export:<Name>.")
    )]
    NodeNotFound(String),

    #[error("Invalid SQL identifier: '{0}'")]
    #[diagnostic(
        code(custodian::domain::identifier),
        help("Table and field names must match [A-Za-z_][A-Za-z0-9_]*.")
    )]
    InvalidIdentifier(String),

    #[error("Rejected query: {0}")]
    #[diagnostic(
        code(custodian::domain::query),
        help("Custom rules accept exactly one read-only SELECT statement.")
    )]
    RejectedQuery(String),

    #[error("Governance summary could not be computed: {0}")]
    #[diagnostic(code(custodian::domain::governance))]
    GovernanceComputationFailed(String),
}
