// custodian-core/src/infrastructure/adapters/memory.rs
//
// GovernanceStore kept entirely in memory. Used by tests and by embedders that
// feed the catalog themselves.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;

use crate::domain::catalog::{DataOwner, Dataset, DatasetField, GlossaryTerm};
use crate::domain::compliance::{SensitiveAccessLog, UserConsent};
use crate::domain::lineage::{LineageEdge, LineageNode};
use crate::domain::quality::{
    DataQualityResult, DataQualityRule, NewQualityResult, RuleFilter, latest_per_rule,
};
use crate::error::CustodianError;
use crate::infrastructure::config::snapshot::CatalogSnapshot;
use crate::ports::store::GovernanceStore;

#[derive(Default)]
struct State {
    nodes: Vec<LineageNode>,
    edges: Vec<LineageEdge>,
    datasets: Vec<Dataset>,
    fields: Vec<DatasetField>,
    owners: Vec<DataOwner>,
    glossary: Vec<GlossaryTerm>,
    rules: Vec<DataQualityRule>,
    results: Vec<DataQualityResult>,
    users: Vec<String>,
    consents: Vec<UserConsent>,
    access_logs: Vec<SensitiveAccessLog>,
    next_result_id: i64,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let store = Self::new();
        {
            let mut s = store.state.write().await;
            s.datasets = snapshot.datasets;
            s.fields = snapshot.fields;
            s.owners = snapshot.owners;
            s.glossary = snapshot.glossary;
            s.nodes = snapshot.nodes;
            s.edges = snapshot.edges;
            s.rules = snapshot.rules;
            s.users = snapshot.users;
            s.consents = snapshot.consents;
            s.access_logs = snapshot.access_logs;
        }
        store
    }

    pub async fn add_nodes(&self, nodes: Vec<LineageNode>) {
        self.state.write().await.nodes.extend(nodes);
    }

    pub async fn add_edges(&self, edges: Vec<LineageEdge>) {
        self.state.write().await.edges.extend(edges);
    }

    pub async fn add_datasets(&self, datasets: Vec<Dataset>) {
        self.state.write().await.datasets.extend(datasets);
    }

    pub async fn add_fields(&self, fields: Vec<DatasetField>) {
        self.state.write().await.fields.extend(fields);
    }

    pub async fn add_owners(&self, owners: Vec<DataOwner>) {
        self.state.write().await.owners.extend(owners);
    }

    pub async fn add_glossary_terms(&self, terms: Vec<GlossaryTerm>) {
        self.state.write().await.glossary.extend(terms);
    }

    pub async fn add_rules(&self, rules: Vec<DataQualityRule>) {
        self.state.write().await.rules.extend(rules);
    }

    pub async fn add_users(&self, user_ids: Vec<String>) {
        self.state.write().await.users.extend(user_ids);
    }

    pub async fn add_consents(&self, consents: Vec<UserConsent>) {
        self.state.write().await.consents.extend(consents);
    }

    pub async fn add_access_logs(&self, logs: Vec<SensitiveAccessLog>) {
        self.state.write().await.access_logs.extend(logs);
    }

    /// Every stored result, in insertion order.
    pub async fn results(&self) -> Vec<DataQualityResult> {
        self.state.read().await.results.clone()
    }
}

#[async_trait]
impl GovernanceStore for InMemoryStore {
    async fn find_node(&self, id: &str) -> Result<Option<LineageNode>, CustodianError> {
        let s = self.state.read().await;
        Ok(s.nodes.iter().find(|n| n.id == id).cloned())
    }

    async fn find_edges_from(&self, id: &str) -> Result<Vec<LineageEdge>, CustodianError> {
        let s = self.state.read().await;
        Ok(s.edges
            .iter()
            .filter(|e| e.source_node_id == id)
            .cloned()
            .collect())
    }

    async fn find_edges_to(&self, id: &str) -> Result<Vec<LineageEdge>, CustodianError> {
        let s = self.state.read().await;
        Ok(s.edges
            .iter()
            .filter(|e| e.target_node_id == id)
            .cloned()
            .collect())
    }

    async fn list_nodes(&self) -> Result<Vec<LineageNode>, CustodianError> {
        Ok(self.state.read().await.nodes.clone())
    }

    async fn list_edges(&self) -> Result<Vec<LineageEdge>, CustodianError> {
        Ok(self.state.read().await.edges.clone())
    }

    async fn find_dataset(&self, id: &str) -> Result<Option<Dataset>, CustodianError> {
        let s = self.state.read().await;
        Ok(s.datasets.iter().find(|d| d.id == id).cloned())
    }

    async fn list_datasets(&self) -> Result<Vec<Dataset>, CustodianError> {
        Ok(self.state.read().await.datasets.clone())
    }

    async fn count_fields_by_dataset(&self) -> Result<HashMap<String, u64>, CustodianError> {
        let s = self.state.read().await;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for field in &s.fields {
            *counts.entry(field.dataset_id.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn count_owners(&self) -> Result<u64, CustodianError> {
        Ok(self.state.read().await.owners.len() as u64)
    }

    async fn count_glossary_terms(&self) -> Result<u64, CustodianError> {
        Ok(self.state.read().await.glossary.len() as u64)
    }

    async fn find_rules(&self, filter: &RuleFilter) -> Result<Vec<DataQualityRule>, CustodianError> {
        let s = self.state.read().await;
        let mut rules: Vec<DataQualityRule> =
            s.rules.iter().filter(|r| filter.matches(r)).cloned().collect();
        rules.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some(limit) = filter.limit {
            rules.truncate(limit);
        }
        Ok(rules)
    }

    async fn insert_result(&self, result: &NewQualityResult) -> Result<DataQualityResult, CustodianError> {
        let mut s = self.state.write().await;
        s.next_result_id += 1;
        let stored = DataQualityResult::from_new(s.next_result_id, result);
        s.results.push(stored.clone());
        Ok(stored)
    }

    async fn latest_results(&self) -> Result<Vec<DataQualityResult>, CustodianError> {
        let s = self.state.read().await;
        Ok(latest_per_rule(s.results.iter().cloned()))
    }

    async fn recent_results(
        &self,
        rule_id: &str,
        limit: usize,
    ) -> Result<Vec<DataQualityResult>, CustodianError> {
        let s = self.state.read().await;
        let mut results: Vec<DataQualityResult> = s
            .results
            .iter()
            .filter(|r| r.rule_id == rule_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| (b.run_date, b.id).cmp(&(a.run_date, a.id)));
        results.truncate(limit);
        Ok(results)
    }

    async fn results_since(&self, since: DateTime<Utc>) -> Result<Vec<DataQualityResult>, CustodianError> {
        let s = self.state.read().await;
        Ok(s.results
            .iter()
            .filter(|r| r.run_date >= since)
            .cloned()
            .collect())
    }

    async fn count_users(&self) -> Result<u64, CustodianError> {
        let s = self.state.read().await;
        let distinct: HashSet<&String> = s.users.iter().collect();
        Ok(distinct.len() as u64)
    }

    async fn count_consented_users(&self) -> Result<u64, CustodianError> {
        let s = self.state.read().await;
        let consented: HashSet<&String> = s
            .consents
            .iter()
            .filter(|c| c.granted)
            .map(|c| &c.user_id)
            .collect();
        Ok(consented.len() as u64)
    }

    async fn access_counts_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<BTreeMap<String, u64>, CustodianError> {
        let s = self.state.read().await;
        let mut counts = BTreeMap::new();
        for log in s.access_logs.iter().filter(|l| l.accessed_at >= since) {
            *counts.entry(log.action.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::quality::{QualityStatus, RuleOutcome};
    use anyhow::Result;
    use chrono::Duration;

    fn new_result(rule: &str, at: DateTime<Utc>) -> NewQualityResult {
        NewQualityResult {
            rule_id: rule.into(),
            outcome: RuleOutcome::checked(false, 10, 0),
            execution_duration_ms: 3,
            run_date: at,
        }
    }

    #[tokio::test]
    async fn test_results_are_appended_with_increasing_ids() -> Result<()> {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let first = store.insert_result(&new_result("r1", now)).await?;
        let second = store.insert_result(&new_result("r1", now + Duration::seconds(1))).await?;

        assert!(second.id > first.id);
        assert_eq!(store.results().await.len(), 2);

        let latest = store.latest_results().await?;
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, second.id);
        assert_eq!(latest[0].status, QualityStatus::Pass);

        let recent = store.recent_results("r1", 1).await?;
        assert_eq!(recent[0].id, second.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_consent_counts_distinct_granted_users() -> Result<()> {
        let store = InMemoryStore::new();
        store.add_users(vec!["u1".into(), "u2".into(), "u3".into()]).await;
        store
            .add_consents(vec![
                UserConsent {
                    user_id: "u1".into(),
                    consent_type: "research".into(),
                    granted: true,
                },
                UserConsent {
                    user_id: "u1".into(),
                    consent_type: "marketing".into(),
                    granted: true,
                },
                UserConsent {
                    user_id: "u2".into(),
                    consent_type: "research".into(),
                    granted: false,
                },
            ])
            .await;

        assert_eq!(store.count_users().await?, 3);
        assert_eq!(store.count_consented_users().await?, 1);
        Ok(())
    }
}
