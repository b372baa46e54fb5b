// custodian-core/src/lib.rs

#![allow(missing_docs)]
// Memory safety
#![deny(unsafe_code)]
// Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Storage access and raw query execution contracts.
pub mod ports;

// 2. Domain (business core)
// Catalog, lineage graph + traversal, quality rules, health scoring.
// Depends on nothing but the ports.
pub mod domain;

// 3. Infrastructure (Adapters)
// DuckDB store, in-memory store, YAML config, catalog snapshots.
pub mod infrastructure;

// 4. Application (Use Cases)
// Lineage queries, rule evaluators, quality runs, governance summary.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use error::CustodianError;
