// custodian-core/src/ports/store.rs
//
// Read access to the catalog, the lineage graph and the quality history, plus
// the one write the core performs: appending quality results.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::domain::catalog::Dataset;
use crate::domain::lineage::{LineageEdge, LineageNode};
use crate::domain::quality::{DataQualityResult, DataQualityRule, NewQualityResult, RuleFilter};
use crate::error::CustodianError;

#[async_trait]
pub trait GovernanceStore: Send + Sync {
    // --- LINEAGE ---
    async fn find_node(&self, id: &str) -> Result<Option<LineageNode>, CustodianError>;

    /// Edges whose source is `id`, in a stable order.
    async fn find_edges_from(&self, id: &str) -> Result<Vec<LineageEdge>, CustodianError>;

    /// Edges whose target is `id`, in a stable order.
    async fn find_edges_to(&self, id: &str) -> Result<Vec<LineageEdge>, CustodianError>;

    async fn list_nodes(&self) -> Result<Vec<LineageNode>, CustodianError>;

    async fn list_edges(&self) -> Result<Vec<LineageEdge>, CustodianError>;

    // --- CATALOG ---
    async fn find_dataset(&self, id: &str) -> Result<Option<Dataset>, CustodianError>;

    async fn list_datasets(&self) -> Result<Vec<Dataset>, CustodianError>;

    /// Field count grouped by dataset id.
    async fn count_fields_by_dataset(&self) -> Result<HashMap<String, u64>, CustodianError>;

    async fn count_owners(&self) -> Result<u64, CustodianError>;

    async fn count_glossary_terms(&self) -> Result<u64, CustodianError>;

    // --- QUALITY ---
    /// Rules matching `filter`, ordered by id, truncated to `filter.limit`.
    async fn find_rules(&self, filter: &RuleFilter) -> Result<Vec<DataQualityRule>, CustodianError>;

    /// Appends one result. Existing rows are never touched.
    async fn insert_result(&self, result: &NewQualityResult) -> Result<DataQualityResult, CustodianError>;

    /// Most recent result per rule (greatest run date, then greatest id).
    async fn latest_results(&self) -> Result<Vec<DataQualityResult>, CustodianError>;

    /// Up to `limit` results of one rule, newest first.
    async fn recent_results(
        &self,
        rule_id: &str,
        limit: usize,
    ) -> Result<Vec<DataQualityResult>, CustodianError>;

    async fn results_since(&self, since: DateTime<Utc>) -> Result<Vec<DataQualityResult>, CustodianError>;

    // --- COMPLIANCE ---
    async fn count_users(&self) -> Result<u64, CustodianError>;

    /// Distinct users holding at least one granted consent.
    async fn count_consented_users(&self) -> Result<u64, CustodianError>;

    /// Sensitive-access log entries since `since`, grouped by action.
    async fn access_counts_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<BTreeMap<String, u64>, CustodianError>;
}
