// custodian-core/src/application/quality.rs
//
// USE CASES: RunQuality (evaluate + persist) and GetQuality (rules with their
// latest results).

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::application::evaluators::{EvaluationError, EvaluatorRegistry};
use crate::domain::catalog::Dataset;
use crate::domain::quality::{
    CriticalFailure, DataQualityResult, DataQualityRule, NewQualityResult, QualityTally,
    RuleFilter, RuleOutcome, RuleType, Severity, critical_failures,
};
use crate::error::CustodianError;
use crate::infrastructure::config::QualitySettings;
use crate::ports::query::QueryExecutor;
use crate::ports::store::GovernanceStore;

/// Number of past results attached per rule by `get_quality` with `include_results`.
pub const RECENT_RESULTS: usize = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityRunFilter {
    pub dataset_id: Option<String>,
    pub rule_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualitySummary {
    #[serde(flatten)]
    pub tally: QualityTally,
    pub quality_score: u8,
}

impl From<QualityTally> for QualitySummary {
    fn from(tally: QualityTally) -> Self {
        Self {
            quality_score: tally.quality_score(),
            tally,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityRun {
    pub results: Vec<DataQualityResult>,
    pub summary: QualitySummary,
}

#[derive(Debug, Clone, Default)]
pub struct QualityQuery {
    pub dataset_id: Option<String>,
    pub rule_type: Option<RuleType>,
    pub severity: Option<Severity>,
    pub include_results: bool,
    /// Defaults to `quality.default_limit`.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleReport {
    #[serde(flatten)]
    pub rule: DataQualityRule,
    pub latest_result: Option<DataQualityResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_results: Option<Vec<DataQualityResult>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReportSummary {
    #[serde(flatten)]
    pub summary: QualitySummary,
    pub critical_failures: Vec<CriticalFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub rules: Vec<RuleReport>,
    pub summary: QualityReportSummary,
}

pub struct QualityService<'a> {
    store: &'a dyn GovernanceStore,
    executor: &'a dyn QueryExecutor,
    registry: EvaluatorRegistry,
    settings: QualitySettings,
}

impl<'a> QualityService<'a> {
    pub fn new(
        store: &'a dyn GovernanceStore,
        executor: &'a dyn QueryExecutor,
        settings: QualitySettings,
    ) -> Self {
        Self {
            store,
            executor,
            registry: EvaluatorRegistry::with_defaults(),
            settings,
        }
    }

    pub fn with_registry(mut self, registry: EvaluatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Evaluates every active rule matching `filter` and appends one result per rule.
    /// Rule failures are recorded as ERROR results; only store faults abort the run.
    #[instrument(skip(self))]
    pub async fn run_quality_checks(&self, filter: &QualityRunFilter) -> Result<QualityRun, CustodianError> {
        let rules = self
            .store
            .find_rules(&RuleFilter {
                dataset_id: filter.dataset_id.clone(),
                rule_ids: filter.rule_ids.clone(),
                ..RuleFilter::active()
            })
            .await?;

        info!(rules = rules.len(), concurrency = self.settings.concurrency, "Starting quality run");

        // Each dataset is looked up once, whatever the number of rules on it.
        let mut datasets: HashMap<String, Option<Dataset>> = HashMap::new();
        for rule in &rules {
            if !datasets.contains_key(&rule.dataset_id) {
                let dataset = self.store.find_dataset(&rule.dataset_id).await?;
                datasets.insert(rule.dataset_id.clone(), dataset);
            }
        }

        let evaluations = rules.iter().enumerate().map(|(position, rule)| {
            let dataset = datasets.get(&rule.dataset_id).and_then(Option::as_ref);
            async move { (position, self.execute_rule(rule, dataset).await) }
        });
        let mut executed: Vec<(usize, NewQualityResult)> = stream::iter(evaluations)
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;
        executed.sort_by_key(|(position, _)| *position);

        let mut tally = QualityTally::default();
        let mut results = Vec::with_capacity(executed.len());
        for (_, new_result) in executed {
            let stored = self.store.insert_result(&new_result).await?;
            tally.record(stored.status);
            results.push(stored);
        }

        let summary = QualitySummary::from(tally);
        info!(
            passed = tally.passed,
            failed = tally.failed,
            errors = tally.errors,
            score = summary.quality_score,
            "Quality run finished"
        );
        Ok(QualityRun { results, summary })
    }

    async fn execute_rule(&self, rule: &DataQualityRule, dataset: Option<&Dataset>) -> NewQualityResult {
        let run_date = Utc::now();
        let started = Instant::now();

        let outcome = match dataset {
            None => {
                warn!(rule = %rule.id, dataset = %rule.dataset_id, "Rule targets an unknown dataset");
                RuleOutcome::error(format!("Dataset '{}' not found in catalog", rule.dataset_id))
            }
            Some(dataset) => {
                let timeout = self.settings.rule_timeout();
                match tokio::time::timeout(timeout, self.registry.evaluate(dataset, rule, self.executor)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(rule = %rule.id, timeout_ms = self.settings.rule_timeout_ms, "Rule timed out");
                        RuleOutcome::error(EvaluationError::Timeout(self.settings.rule_timeout_ms).to_string())
                    }
                }
            }
        };

        NewQualityResult {
            rule_id: rule.id.clone(),
            outcome,
            execution_duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            run_date,
        }
    }

    /// Lists rules (active or not) with their latest result. The summary covers
    /// the latest results of the listed rules; rules that never ran are not counted.
    #[instrument(skip(self))]
    pub async fn get_quality(&self, query: &QualityQuery) -> Result<QualityReport, CustodianError> {
        let rules = self
            .store
            .find_rules(&RuleFilter {
                dataset_id: query.dataset_id.clone(),
                rule_type: query.rule_type,
                severity: query.severity,
                limit: Some(query.limit.unwrap_or(self.settings.default_limit)),
                ..RuleFilter::default()
            })
            .await?;

        let mut latest: HashMap<String, DataQualityResult> = self
            .store
            .latest_results()
            .await?
            .into_iter()
            .map(|r| (r.rule_id.clone(), r))
            .collect();

        let mut reports = Vec::with_capacity(rules.len());
        let mut listed_latest = Vec::new();
        for rule in rules {
            let latest_result = latest.remove(&rule.id);
            if let Some(result) = &latest_result {
                listed_latest.push(result.clone());
            }
            let recent_results = if query.include_results {
                Some(self.store.recent_results(&rule.id, RECENT_RESULTS).await?)
            } else {
                None
            };
            reports.push(RuleReport {
                rule,
                latest_result,
                recent_results,
            });
        }

        let listed_rules: Vec<DataQualityRule> = reports.iter().map(|r| r.rule.clone()).collect();
        let tally = QualityTally::from_statuses(listed_latest.iter().map(|r| r.status));

        Ok(QualityReport {
            rules: reports,
            summary: QualityReportSummary {
                summary: QualitySummary::from(tally),
                critical_failures: critical_failures(&listed_rules, &listed_latest),
            },
        })
    }
}
