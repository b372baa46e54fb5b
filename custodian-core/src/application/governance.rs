// custodian-core/src/application/governance.rs
//
// USE CASE: GetGovernanceSummary. Four independent metric groups gathered
// concurrently, then folded into the health score and alerts.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info, instrument};

use crate::domain::catalog::Sensitivity;
use crate::domain::error::DomainError;
use crate::domain::governance::{Alert, HealthInputs, ScoreBreakdown, derive_alerts, percentage};
use crate::domain::lineage::Namespace;
use crate::domain::quality::{
    CriticalFailure, QualityStatus, QualityTally, RuleFilter, critical_failures,
};
use crate::error::CustodianError;
use crate::ports::store::GovernanceStore;

pub const TREND_DAYS: i64 = 7;
pub const ACCESS_WINDOW_DAYS: i64 = 30;

const UNASSIGNED_DOMAIN: &str = "unassigned";

// ── Metric groups ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegulatedDataset {
    pub id: String,
    pub name: String,
    pub sensitivity: Sensitivity,
    pub field_count: u64,
    pub owner_team: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMetrics {
    pub total_datasets: u64,
    pub total_fields: u64,
    pub total_owners: u64,
    pub total_glossary_terms: u64,
    pub by_sensitivity: BTreeMap<String, u64>,
    pub by_domain: BTreeMap<String, u64>,
    /// PHI and PII datasets, most sensitive first.
    pub regulated_datasets: Vec<RegulatedDataset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub passed: u64,
    pub failed: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    #[serde(flatten)]
    pub tally: QualityTally,
    pub quality_score: u8,
    pub critical_failures: Vec<CriticalFailure>,
    /// One point per UTC day, oldest first, empty days included.
    pub trend: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageMetrics {
    pub total_nodes: u64,
    pub total_edges: u64,
    pub nodes_by_type: BTreeMap<String, u64>,
    pub phi_lineage_coverage: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceMetrics {
    pub total_users: u64,
    pub consented_users: u64,
    pub consent_coverage: u8,
    /// Sensitive access events over the trailing window, by action.
    pub sensitive_access: BTreeMap<String, u64>,
    pub sensitive_access_total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceSummary {
    pub catalog: CatalogMetrics,
    pub quality: QualityMetrics,
    pub lineage: LineageMetrics,
    pub compliance: ComplianceMetrics,
    pub scores: ScoreBreakdown,
    pub health_score: u8,
    pub alerts: Vec<Alert>,
    pub last_updated: DateTime<Utc>,
}

// ── Aggregator ───────────────────────────────────────────────────────

pub struct GovernanceAggregator<'a> {
    store: &'a dyn GovernanceStore,
}

impl<'a> GovernanceAggregator<'a> {
    pub fn new(store: &'a dyn GovernanceStore) -> Self {
        Self { store }
    }

    pub async fn summarize(&self) -> Result<GovernanceSummary, CustodianError> {
        self.summarize_at(Utc::now()).await
    }

    /// Summary as of `now`, which anchors the trend and access windows.
    #[instrument(skip(self))]
    pub async fn summarize_at(&self, now: DateTime<Utc>) -> Result<GovernanceSummary, CustodianError> {
        let (catalog, quality, lineage, compliance) = futures::try_join!(
            self.catalog_metrics(),
            self.quality_metrics(now),
            self.lineage_metrics(),
            self.compliance_metrics(now)
        )
        .map_err(|e| {
            error!(error = %e, "Governance aggregation failed");
            DomainError::GovernanceComputationFailed(e.to_string())
        })?;

        let scores = ScoreBreakdown::compute(&HealthInputs {
            quality_score: quality.quality_score,
            dataset_count: catalog.total_datasets,
            node_count: lineage.total_nodes,
            edge_count: lineage.total_edges,
            owner_count: catalog.total_owners,
            consent_coverage: compliance.consent_coverage,
        });
        let alerts = derive_alerts(
            quality.critical_failures.len(),
            quality.quality_score,
            compliance.consent_coverage,
        );

        info!(health = scores.health_score, alerts = alerts.len(), "Governance summary computed");

        Ok(GovernanceSummary {
            health_score: scores.health_score,
            catalog,
            quality,
            lineage,
            compliance,
            scores,
            alerts,
            last_updated: now,
        })
    }

    async fn catalog_metrics(&self) -> Result<CatalogMetrics, CustodianError> {
        let datasets = self.store.list_datasets().await?;
        let field_counts = self.store.count_fields_by_dataset().await?;
        let total_owners = self.store.count_owners().await?;
        let total_glossary_terms = self.store.count_glossary_terms().await?;

        let mut by_sensitivity = BTreeMap::new();
        let mut by_domain = BTreeMap::new();
        for dataset in &datasets {
            *by_sensitivity.entry(dataset.sensitivity.to_string()).or_insert(0) += 1;
            let domain = dataset.domain.as_deref().unwrap_or(UNASSIGNED_DOMAIN);
            *by_domain.entry(domain.to_string()).or_insert(0) += 1;
        }

        let mut regulated_datasets: Vec<RegulatedDataset> = datasets
            .iter()
            .filter(|d| d.sensitivity.is_regulated())
            .map(|d| RegulatedDataset {
                id: d.id.clone(),
                name: d.name.clone(),
                sensitivity: d.sensitivity,
                field_count: field_counts.get(&d.id).copied().unwrap_or(0),
                owner_team: d.owner_team.clone(),
            })
            .collect();
        regulated_datasets.sort_by(|a, b| b.sensitivity.cmp(&a.sensitivity).then_with(|| a.name.cmp(&b.name)));

        Ok(CatalogMetrics {
            total_datasets: datasets.len() as u64,
            total_fields: field_counts.values().sum(),
            total_owners,
            total_glossary_terms,
            by_sensitivity,
            by_domain,
            regulated_datasets,
        })
    }

    async fn quality_metrics(&self, now: DateTime<Utc>) -> Result<QualityMetrics, CustodianError> {
        let latest = self.store.latest_results().await?;
        let rules = self.store.find_rules(&RuleFilter::default()).await?;

        let tally = QualityTally::from_statuses(latest.iter().map(|r| r.status));

        let today = now.date_naive();
        let first_day = today - Duration::days(TREND_DAYS - 1);
        let mut buckets: BTreeMap<NaiveDate, TrendPoint> = (0..TREND_DAYS)
            .map(|offset| {
                let date = first_day + Duration::days(offset);
                (
                    date,
                    TrendPoint {
                        date,
                        passed: 0,
                        failed: 0,
                        errors: 0,
                    },
                )
            })
            .collect();

        let since = first_day.and_time(NaiveTime::MIN).and_utc();
        for result in self.store.results_since(since).await? {
            if let Some(point) = buckets.get_mut(&result.run_date.date_naive()) {
                match result.status {
                    QualityStatus::Pass => point.passed += 1,
                    QualityStatus::Fail => point.failed += 1,
                    QualityStatus::Error => point.errors += 1,
                }
            }
        }

        Ok(QualityMetrics {
            quality_score: tally.quality_score(),
            tally,
            critical_failures: critical_failures(&rules, &latest),
            trend: buckets.into_values().collect(),
        })
    }

    async fn lineage_metrics(&self) -> Result<LineageMetrics, CustodianError> {
        let nodes = self.store.list_nodes().await?;
        let edges = self.store.list_edges().await?;
        let datasets = self.store.list_datasets().await?;

        let mut nodes_by_type = BTreeMap::new();
        for node in &nodes {
            *nodes_by_type.entry(node.node_type.to_string()).or_insert(0) += 1;
        }

        let phi: Vec<_> = datasets
            .iter()
            .filter(|d| d.sensitivity == Sensitivity::Phi)
            .collect();
        let traced = phi
            .iter()
            .filter(|d| {
                let node_id = d.lineage_node_id();
                nodes
                    .iter()
                    .any(|n| n.id == node_id && n.namespace() == Some(Namespace::Database))
            })
            .count();

        Ok(LineageMetrics {
            total_nodes: nodes.len() as u64,
            total_edges: edges.len() as u64,
            nodes_by_type,
            phi_lineage_coverage: percentage(traced as u64, phi.len() as u64, 100),
        })
    }

    async fn compliance_metrics(&self, now: DateTime<Utc>) -> Result<ComplianceMetrics, CustodianError> {
        let total_users = self.store.count_users().await?;
        let consented_users = self.store.count_consented_users().await?;
        let sensitive_access = self
            .store
            .access_counts_since(now - Duration::days(ACCESS_WINDOW_DAYS))
            .await?;

        Ok(ComplianceMetrics {
            total_users,
            consented_users,
            consent_coverage: percentage(consented_users, total_users, 0),
            sensitive_access_total: sensitive_access.values().sum(),
            sensitive_access,
        })
    }
}
