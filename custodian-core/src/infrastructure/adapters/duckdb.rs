// custodian-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::types::Value as DbValue;
use duckdb::{Config, Connection, InterruptHandle, OptionalExt, Row, params, params_from_iter};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

// Hexagonal imports
use crate::domain::catalog::{Dataset, Sensitivity};
use crate::domain::lineage::{LineageEdge, LineageNode, NodeType};
use crate::domain::quality::{
    DataQualityResult, DataQualityRule, NewQualityResult, QualityStatus, RuleFilter, RuleType,
    Severity,
};
use crate::domain::sql::{SqlParam, SqlQuery};
use crate::error::CustodianError;
use crate::infrastructure::config::snapshot::CatalogSnapshot;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::ports::query::{QueryExecutor, QueryRow};
use crate::ports::store::GovernanceStore;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS datasets (
    id VARCHAR PRIMARY KEY,
    name VARCHAR NOT NULL,
    sensitivity VARCHAR NOT NULL,
    domain VARCHAR,
    owner_team VARCHAR,
    retention_policy VARCHAR,
    description VARCHAR
);
CREATE TABLE IF NOT EXISTS dataset_fields (
    dataset_id VARCHAR NOT NULL,
    field_name VARCHAR NOT NULL,
    data_type VARCHAR NOT NULL,
    is_sensitive BOOLEAN NOT NULL DEFAULT FALSE,
    PRIMARY KEY (dataset_id, field_name)
);
CREATE TABLE IF NOT EXISTS data_owners (
    id VARCHAR PRIMARY KEY,
    name VARCHAR NOT NULL,
    team VARCHAR,
    email VARCHAR
);
CREATE TABLE IF NOT EXISTS glossary_terms (
    id VARCHAR PRIMARY KEY,
    term VARCHAR NOT NULL,
    definition VARCHAR
);
CREATE TABLE IF NOT EXISTS lineage_nodes (
    id VARCHAR PRIMARY KEY,
    name VARCHAR NOT NULL,
    node_type VARCHAR NOT NULL,
    metadata VARCHAR NOT NULL DEFAULT '{}'
);
CREATE SEQUENCE IF NOT EXISTS lineage_edges_seq;
CREATE TABLE IF NOT EXISTS lineage_edges (
    id VARCHAR PRIMARY KEY,
    ordinal BIGINT NOT NULL DEFAULT nextval('lineage_edges_seq'),
    source_node_id VARCHAR NOT NULL,
    target_node_id VARCHAR NOT NULL,
    transformation_logic VARCHAR
);
CREATE TABLE IF NOT EXISTS dq_rules (
    id VARCHAR PRIMARY KEY,
    dataset_id VARCHAR NOT NULL,
    field_name VARCHAR,
    rule_type VARCHAR NOT NULL,
    criteria VARCHAR NOT NULL DEFAULT '{}',
    severity VARCHAR NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    description VARCHAR
);
CREATE SEQUENCE IF NOT EXISTS dq_results_seq;
CREATE TABLE IF NOT EXISTS dq_results (
    id BIGINT PRIMARY KEY DEFAULT nextval('dq_results_seq'),
    rule_id VARCHAR NOT NULL,
    status VARCHAR NOT NULL,
    records_checked BIGINT NOT NULL,
    failures_found BIGINT NOT NULL,
    anomaly_score DOUBLE,
    execution_duration_ms BIGINT NOT NULL,
    run_at BIGINT NOT NULL,
    message VARCHAR
);
CREATE TABLE IF NOT EXISTS users (
    id VARCHAR PRIMARY KEY
);
CREATE TABLE IF NOT EXISTS user_consents (
    user_id VARCHAR NOT NULL,
    consent_type VARCHAR NOT NULL,
    granted BOOLEAN NOT NULL,
    PRIMARY KEY (user_id, consent_type)
);
CREATE TABLE IF NOT EXISTS sensitive_access_logs (
    user_id VARCHAR NOT NULL,
    dataset_id VARCHAR,
    action VARCHAR NOT NULL,
    accessed_at BIGINT NOT NULL
);
"#;

// datasets.name has no UNIQUE constraint: DuckDB rejects INSERT OR REPLACE on a table
// with two unique keys. `load_snapshot` checks name collisions itself.

const RESULT_COLUMNS: &str = "id, rule_id, status, records_checked, failures_found, anomaly_score, execution_duration_ms, run_at, message";
const RULE_COLUMNS: &str =
    "id, dataset_id, field_name, rule_type, criteria, severity, is_active, description";
const DATASET_COLUMNS: &str =
    "id, name, sensitivity, domain, owner_team, retention_policy, description";

/// Row counts written by `load_snapshot`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub datasets: usize,
    pub nodes: usize,
    pub edges: usize,
    pub rules: usize,
}

pub struct DuckDBStore {
    conn: Arc<Mutex<Connection>>,
    interrupt: Arc<InterruptHandle>,
}

impl DuckDBStore {
    /// Opens (or creates) the database and makes sure the governance schema exists.
    pub fn new(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();

        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };
        conn.execute_batch(SCHEMA)?;
        debug!(db_path, "Governance schema ready");

        let interrupt = conn.interrupt_handle();
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
        })
    }

    pub fn in_memory() -> Result<Self, InfrastructureError> {
        Self::new(":memory:")
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CustodianError> {
        self.conn.lock().map_err(|_| poisoned())
    }

    /// Runs raw DDL/DML. Meant for provisioning the governed tables, not for rule queries.
    pub fn execute_batch(&self, sql: &str) -> Result<(), CustodianError> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// Upserts every record of `snapshot` in one transaction. Loading the same
    /// snapshot twice leaves the database unchanged.
    #[instrument(skip(self, snapshot))]
    pub fn load_snapshot(&self, snapshot: &CatalogSnapshot) -> Result<SeedReport, CustodianError> {
        snapshot.check_integrity()?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for d in &snapshot.datasets {
            let taken_by: Option<String> = tx
                .query_row(
                    "SELECT id FROM datasets WHERE name = ? AND id <> ?",
                    params![d.name, d.id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(other) = taken_by {
                return Err(InfrastructureError::ConfigError(format!(
                    "Dataset name '{}' is already used by dataset '{}'",
                    d.name, other
                ))
                .into());
            }
            tx.execute(
                &format!("INSERT OR REPLACE INTO datasets ({}) VALUES (?, ?, ?, ?, ?, ?, ?)", DATASET_COLUMNS),
                params![
                    d.id,
                    d.name,
                    d.sensitivity.as_str(),
                    d.domain,
                    d.owner_team,
                    d.retention_policy,
                    d.description
                ],
            )?;
        }
        for f in &snapshot.fields {
            tx.execute(
                "INSERT OR REPLACE INTO dataset_fields (dataset_id, field_name, data_type, is_sensitive) VALUES (?, ?, ?, ?)",
                params![f.dataset_id, f.field_name, f.data_type, f.is_sensitive],
            )?;
        }
        for o in &snapshot.owners {
            tx.execute(
                "INSERT OR REPLACE INTO data_owners (id, name, team, email) VALUES (?, ?, ?, ?)",
                params![o.id, o.name, o.team, o.email],
            )?;
        }
        for g in &snapshot.glossary {
            tx.execute(
                "INSERT OR REPLACE INTO glossary_terms (id, term, definition) VALUES (?, ?, ?)",
                params![g.id, g.term, g.definition],
            )?;
        }
        for n in &snapshot.nodes {
            let metadata = serde_json::to_string(&n.metadata).map_err(InfrastructureError::from)?;
            tx.execute(
                "INSERT OR REPLACE INTO lineage_nodes (id, name, node_type, metadata) VALUES (?, ?, ?, ?)",
                params![n.id, n.name, n.node_type.as_str(), metadata],
            )?;
        }
        for e in &snapshot.edges {
            tx.execute(
                "INSERT OR REPLACE INTO lineage_edges (id, source_node_id, target_node_id, transformation_logic) VALUES (?, ?, ?, ?)",
                params![e.id, e.source_node_id, e.target_node_id, e.transformation_logic],
            )?;
        }
        for r in &snapshot.rules {
            let criteria = serde_json::to_string(&r.criteria).map_err(InfrastructureError::from)?;
            tx.execute(
                &format!("INSERT OR REPLACE INTO dq_rules ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)", RULE_COLUMNS),
                params![
                    r.id,
                    r.dataset_id,
                    r.field_name,
                    r.rule_type.as_str(),
                    criteria,
                    r.severity.as_str(),
                    r.is_active,
                    r.description
                ],
            )?;
        }
        for user in &snapshot.users {
            tx.execute("INSERT OR IGNORE INTO users (id) VALUES (?)", params![user])?;
        }
        for c in &snapshot.consents {
            tx.execute(
                "INSERT OR REPLACE INTO user_consents (user_id, consent_type, granted) VALUES (?, ?, ?)",
                params![c.user_id, c.consent_type, c.granted],
            )?;
        }
        for log in &snapshot.access_logs {
            // No natural key (dataset_id is nullable): skip rows already present.
            let accessed_at = log.accessed_at.timestamp_micros();
            let seen: i64 = tx.query_row(
                "SELECT COUNT(*) FROM sensitive_access_logs
                 WHERE user_id = ? AND dataset_id IS NOT DISTINCT FROM ? AND action = ? AND accessed_at = ?",
                params![log.user_id, log.dataset_id, log.action, accessed_at],
                |row| row.get(0),
            )?;
            if seen == 0 {
                tx.execute(
                    "INSERT INTO sensitive_access_logs (user_id, dataset_id, action, accessed_at) VALUES (?, ?, ?, ?)",
                    params![log.user_id, log.dataset_id, log.action, accessed_at],
                )?;
            }
        }

        tx.commit()?;

        let report = SeedReport {
            datasets: snapshot.datasets.len(),
            nodes: snapshot.nodes.len(),
            edges: snapshot.edges.len(),
            rules: snapshot.rules.len(),
        };
        info!(?report, "Catalog snapshot loaded");
        Ok(report)
    }

    fn count(&self, sql: &str) -> Result<u64, CustodianError> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    }

    fn query_edges(&self, sql: &str, id: &str) -> Result<Vec<LineageEdge>, CustodianError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![id], edge_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn query_results(
        &self,
        sql: &str,
        args: Vec<DbValue>,
    ) -> Result<Vec<DataQualityResult>, CustodianError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let raw = stmt
            .query_map(params_from_iter(args.iter()), RawResult::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawResult::into_domain).collect()
    }
}

// ── Row mapping ─────────────────────────────────────────────────────

fn poisoned() -> CustodianError {
    CustodianError::from(InfrastructureError::from(DatabaseError::Poisoned))
}

fn corrupted(table: &str, reason: impl Into<String>) -> CustodianError {
    CustodianError::from(InfrastructureError::from(DatabaseError::CorruptedRecord {
        table: table.to_string(),
        reason: reason.into(),
    }))
}

fn parse_enum<T: FromStr<Err = String>>(table: &str, raw: &str) -> Result<T, CustodianError> {
    T::from_str(raw).map_err(|e| corrupted(table, e))
}

fn edge_from_row(row: &Row<'_>) -> duckdb::Result<LineageEdge> {
    Ok(LineageEdge {
        id: row.get(0)?,
        source_node_id: row.get(1)?,
        target_node_id: row.get(2)?,
        transformation_logic: row.get(3)?,
    })
}

struct RawNode {
    id: String,
    name: String,
    node_type: String,
    metadata: String,
}

impl RawNode {
    fn from_row(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            node_type: row.get(2)?,
            metadata: row.get(3)?,
        })
    }

    fn into_domain(self) -> Result<LineageNode, CustodianError> {
        let metadata = serde_json::from_str(&self.metadata)
            .map_err(|e| corrupted("lineage_nodes", e.to_string()))?;
        Ok(LineageNode {
            node_type: parse_enum::<NodeType>("lineage_nodes", &self.node_type)?,
            id: self.id,
            name: self.name,
            metadata,
        })
    }
}

struct RawDataset {
    id: String,
    name: String,
    sensitivity: String,
    domain: Option<String>,
    owner_team: Option<String>,
    retention_policy: Option<String>,
    description: Option<String>,
}

impl RawDataset {
    fn from_row(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            sensitivity: row.get(2)?,
            domain: row.get(3)?,
            owner_team: row.get(4)?,
            retention_policy: row.get(5)?,
            description: row.get(6)?,
        })
    }

    fn into_domain(self) -> Result<Dataset, CustodianError> {
        Ok(Dataset {
            sensitivity: parse_enum::<Sensitivity>("datasets", &self.sensitivity)?,
            id: self.id,
            name: self.name,
            domain: self.domain,
            owner_team: self.owner_team,
            retention_policy: self.retention_policy,
            description: self.description,
        })
    }
}

struct RawRule {
    id: String,
    dataset_id: String,
    field_name: Option<String>,
    rule_type: String,
    criteria: String,
    severity: String,
    is_active: bool,
    description: Option<String>,
}

impl RawRule {
    fn from_row(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            dataset_id: row.get(1)?,
            field_name: row.get(2)?,
            rule_type: row.get(3)?,
            criteria: row.get(4)?,
            severity: row.get(5)?,
            is_active: row.get(6)?,
            description: row.get(7)?,
        })
    }

    fn into_domain(self) -> Result<DataQualityRule, CustodianError> {
        // Malformed criteria stay as a string; the evaluator reports it as ERROR.
        let criteria = serde_json::from_str(&self.criteria)
            .unwrap_or(JsonValue::String(self.criteria.clone()));
        Ok(DataQualityRule {
            rule_type: parse_enum::<RuleType>("dq_rules", &self.rule_type)?,
            severity: parse_enum::<Severity>("dq_rules", &self.severity)?,
            id: self.id,
            dataset_id: self.dataset_id,
            field_name: self.field_name,
            criteria,
            is_active: self.is_active,
            description: self.description,
        })
    }
}

struct RawResult {
    id: i64,
    rule_id: String,
    status: String,
    records_checked: i64,
    failures_found: i64,
    anomaly_score: Option<f64>,
    execution_duration_ms: i64,
    run_at: i64,
    message: Option<String>,
}

impl RawResult {
    fn from_row(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            rule_id: row.get(1)?,
            status: row.get(2)?,
            records_checked: row.get(3)?,
            failures_found: row.get(4)?,
            anomaly_score: row.get(5)?,
            execution_duration_ms: row.get(6)?,
            run_at: row.get(7)?,
            message: row.get(8)?,
        })
    }

    fn into_domain(self) -> Result<DataQualityResult, CustodianError> {
        let run_date = DateTime::<Utc>::from_timestamp_micros(self.run_at)
            .ok_or_else(|| corrupted("dq_results", format!("invalid run_at {}", self.run_at)))?;
        Ok(DataQualityResult {
            status: parse_enum::<QualityStatus>("dq_results", &self.status)?,
            id: self.id,
            rule_id: self.rule_id,
            records_checked: self.records_checked.max(0) as u64,
            failures_found: self.failures_found.max(0) as u64,
            anomaly_score: self.anomaly_score,
            execution_duration_ms: self.execution_duration_ms.max(0) as u64,
            run_date,
            message: self.message,
        })
    }
}

fn to_db_value(param: &SqlParam) -> DbValue {
    match param {
        SqlParam::Integer(i) => DbValue::BigInt(*i),
        SqlParam::Float(f) => DbValue::Double(*f),
        SqlParam::Text(s) => DbValue::Text(s.clone()),
    }
}

fn to_json_value(value: DbValue) -> JsonValue {
    match value {
        DbValue::Null => JsonValue::Null,
        DbValue::Boolean(b) => JsonValue::Bool(b),
        DbValue::TinyInt(i) => JsonValue::from(i),
        DbValue::SmallInt(i) => JsonValue::from(i),
        DbValue::Int(i) => JsonValue::from(i),
        DbValue::BigInt(i) => JsonValue::from(i),
        // SUM over integers yields HUGEINT
        DbValue::HugeInt(i) => match i64::try_from(i) {
            Ok(small) => JsonValue::from(small),
            Err(_) => JsonValue::String(i.to_string()),
        },
        DbValue::UTinyInt(u) => JsonValue::from(u),
        DbValue::USmallInt(u) => JsonValue::from(u),
        DbValue::UInt(u) => JsonValue::from(u),
        DbValue::UBigInt(u) => JsonValue::from(u),
        DbValue::Float(f) => JsonValue::from(f64::from(f)),
        DbValue::Double(f) => JsonValue::from(f),
        DbValue::Decimal(d) => JsonValue::String(d.to_string()),
        DbValue::Text(s) => JsonValue::String(s),
        other => JsonValue::String(format!("{:?}", other)),
    }
}

fn fetch_first_row(conn: &Connection, sql: &str, values: &[DbValue]) -> Result<Option<QueryRow>, CustodianError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(values.iter()))?;

    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let names = row.as_ref().column_names();
    let mut out = QueryRow::new();
    for (i, name) in names.iter().enumerate() {
        let value: DbValue = row.get(i)?;
        out.insert(name, to_json_value(value));
    }
    Ok(Some(out))
}

/// Interrupts the connection when a rule query future is dropped (timeout) while
/// its statement is still executing on the blocking pool.
struct InterruptOnDrop {
    handle: Arc<InterruptHandle>,
    running: Arc<AtomicBool>,
    armed: bool,
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        if self.armed && self.running.load(Ordering::SeqCst) {
            warn!("Interrupting abandoned rule query");
            self.handle.interrupt();
        }
    }
}

// ── Ports ────────────────────────────────────────────────────────────

#[async_trait]
impl QueryExecutor for DuckDBStore {
    /// Runs on the blocking pool so that a per-rule timeout can fire while the
    /// statement executes.
    async fn fetch_one(&self, query: &SqlQuery) -> Result<Option<QueryRow>, CustodianError> {
        debug!(sql = %query.sql, params = query.params.len(), "Executing rule query");
        let conn = Arc::clone(&self.conn);
        let sql = query.sql.clone();
        let values: Vec<DbValue> = query.params.iter().map(to_db_value).collect();

        let running = Arc::new(AtomicBool::new(false));
        let mut guard = InterruptOnDrop {
            handle: Arc::clone(&self.interrupt),
            running: Arc::clone(&running),
            armed: true,
        };

        let task = tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| poisoned())?;
            running.store(true, Ordering::SeqCst);
            let row = fetch_first_row(&conn, &sql, &values);
            // Cleared while the lock is held, so the guard never hits a later statement.
            running.store(false, Ordering::SeqCst);
            row
        });

        let row = task
            .await
            .map_err(|e| CustodianError::InternalError(format!("Rule query task failed: {}", e)))?;
        guard.armed = false;
        row
    }
}

#[async_trait]
impl GovernanceStore for DuckDBStore {
    async fn find_node(&self, id: &str) -> Result<Option<LineageNode>, CustodianError> {
        let raw = {
            let conn = self.lock()?;
            let mut stmt =
                conn.prepare("SELECT id, name, node_type, metadata FROM lineage_nodes WHERE id = ?")?;
            let mut rows = stmt.query_map(params![id], RawNode::from_row)?;
            rows.next().transpose()?
        };
        raw.map(RawNode::into_domain).transpose()
    }

    async fn find_edges_from(&self, id: &str) -> Result<Vec<LineageEdge>, CustodianError> {
        self.query_edges(
            "SELECT id, source_node_id, target_node_id, transformation_logic FROM lineage_edges WHERE source_node_id = ? ORDER BY ordinal",
            id,
        )
    }

    async fn find_edges_to(&self, id: &str) -> Result<Vec<LineageEdge>, CustodianError> {
        self.query_edges(
            "SELECT id, source_node_id, target_node_id, transformation_logic FROM lineage_edges WHERE target_node_id = ? ORDER BY ordinal",
            id,
        )
    }

    async fn list_nodes(&self) -> Result<Vec<LineageNode>, CustodianError> {
        let raw = {
            let conn = self.lock()?;
            let mut stmt =
                conn.prepare("SELECT id, name, node_type, metadata FROM lineage_nodes ORDER BY id")?;
            let rows = stmt.query_map([], RawNode::from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        raw.into_iter().map(RawNode::into_domain).collect()
    }

    async fn list_edges(&self) -> Result<Vec<LineageEdge>, CustodianError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, source_node_id, target_node_id, transformation_logic FROM lineage_edges ORDER BY ordinal",
        )?;
        let rows = stmt.query_map([], edge_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn find_dataset(&self, id: &str) -> Result<Option<Dataset>, CustodianError> {
        let raw = {
            let conn = self.lock()?;
            let mut stmt =
                conn.prepare(&format!("SELECT {} FROM datasets WHERE id = ?", DATASET_COLUMNS))?;
            let mut rows = stmt.query_map(params![id], RawDataset::from_row)?;
            rows.next().transpose()?
        };
        raw.map(RawDataset::into_domain).transpose()
    }

    async fn list_datasets(&self) -> Result<Vec<Dataset>, CustodianError> {
        let raw = {
            let conn = self.lock()?;
            let mut stmt =
                conn.prepare(&format!("SELECT {} FROM datasets ORDER BY name", DATASET_COLUMNS))?;
            let rows = stmt.query_map([], RawDataset::from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        raw.into_iter().map(RawDataset::into_domain).collect()
    }

    async fn count_fields_by_dataset(&self) -> Result<HashMap<String, u64>, CustodianError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT dataset_id, COUNT(*) FROM dataset_fields GROUP BY dataset_id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut counts = HashMap::new();
        for row in rows {
            let (dataset_id, n) = row?;
            counts.insert(dataset_id, n.max(0) as u64);
        }
        Ok(counts)
    }

    async fn count_owners(&self) -> Result<u64, CustodianError> {
        self.count("SELECT COUNT(*) FROM data_owners")
    }

    async fn count_glossary_terms(&self) -> Result<u64, CustodianError> {
        self.count("SELECT COUNT(*) FROM glossary_terms")
    }

    async fn find_rules(&self, filter: &RuleFilter) -> Result<Vec<DataQualityRule>, CustodianError> {
        let mut sql = format!("SELECT {} FROM dq_rules WHERE 1 = 1", RULE_COLUMNS);
        let mut args: Vec<DbValue> = Vec::new();

        if filter.active_only {
            sql.push_str(" AND is_active");
        }
        if let Some(dataset_id) = &filter.dataset_id {
            sql.push_str(" AND dataset_id = ?");
            args.push(DbValue::Text(dataset_id.clone()));
        }
        if let Some(ids) = &filter.rule_ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; ids.len()].join(", ");
            sql.push_str(&format!(" AND id IN ({})", placeholders));
            args.extend(ids.iter().map(|id| DbValue::Text(id.clone())));
        }
        if let Some(rule_type) = filter.rule_type {
            sql.push_str(" AND rule_type = ?");
            args.push(DbValue::Text(rule_type.as_str().to_string()));
        }
        if let Some(severity) = filter.severity {
            sql.push_str(" AND severity = ?");
            args.push(DbValue::Text(severity.as_str().to_string()));
        }
        sql.push_str(" ORDER BY id");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            args.push(DbValue::BigInt(i64::try_from(limit).unwrap_or(i64::MAX)));
        }

        let raw = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args.iter()), RawRule::from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        raw.into_iter().map(RawRule::into_domain).collect()
    }

    async fn insert_result(&self, result: &NewQualityResult) -> Result<DataQualityResult, CustodianError> {
        let outcome = &result.outcome;
        let id: i64 = {
            let conn = self.lock()?;
            conn.query_row(
                "INSERT INTO dq_results (rule_id, status, records_checked, failures_found, anomaly_score, execution_duration_ms, run_at, message) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
                params![
                    result.rule_id,
                    outcome.status.as_str(),
                    i64::try_from(outcome.records_checked).unwrap_or(i64::MAX),
                    i64::try_from(outcome.failures_found).unwrap_or(i64::MAX),
                    outcome.anomaly_score,
                    i64::try_from(result.execution_duration_ms).unwrap_or(i64::MAX),
                    result.run_date.timestamp_micros(),
                    outcome.message
                ],
                |row| row.get(0),
            )?
        };
        debug!(id, rule = %result.rule_id, status = %outcome.status, "Quality result appended");
        Ok(DataQualityResult::from_new(id, result))
    }

    async fn latest_results(&self) -> Result<Vec<DataQualityResult>, CustodianError> {
        self.query_results(
            &format!(
                "SELECT {} FROM dq_results QUALIFY row_number() OVER (PARTITION BY rule_id ORDER BY run_at DESC, id DESC) = 1 ORDER BY rule_id",
                RESULT_COLUMNS
            ),
            Vec::new(),
        )
    }

    async fn recent_results(
        &self,
        rule_id: &str,
        limit: usize,
    ) -> Result<Vec<DataQualityResult>, CustodianError> {
        self.query_results(
            &format!(
                "SELECT {} FROM dq_results WHERE rule_id = ? ORDER BY run_at DESC, id DESC LIMIT ?",
                RESULT_COLUMNS
            ),
            vec![
                DbValue::Text(rule_id.to_string()),
                DbValue::BigInt(i64::try_from(limit).unwrap_or(i64::MAX)),
            ],
        )
    }

    async fn results_since(&self, since: DateTime<Utc>) -> Result<Vec<DataQualityResult>, CustodianError> {
        self.query_results(
            &format!(
                "SELECT {} FROM dq_results WHERE run_at >= ? ORDER BY run_at, id",
                RESULT_COLUMNS
            ),
            vec![DbValue::BigInt(since.timestamp_micros())],
        )
    }

    async fn count_users(&self) -> Result<u64, CustodianError> {
        self.count("SELECT COUNT(*) FROM users")
    }

    async fn count_consented_users(&self) -> Result<u64, CustodianError> {
        self.count("SELECT COUNT(DISTINCT user_id) FROM user_consents WHERE granted")
    }

    async fn access_counts_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<BTreeMap<String, u64>, CustodianError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT action, COUNT(*) FROM sensitive_access_logs WHERE accessed_at >= ? GROUP BY action",
        )?;
        let rows = stmt.query_map(params![since.timestamp_micros()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut counts = BTreeMap::new();
        for row in rows {
            let (action, n) = row?;
            counts.insert(action, n.max(0) as u64);
        }
        Ok(counts)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::catalog::DatasetField;
    use crate::domain::compliance::{SensitiveAccessLog, UserConsent};
    use crate::domain::quality::RuleOutcome;
    use anyhow::Result;
    use chrono::Duration;

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot {
            datasets: vec![Dataset {
                id: "ds-1".into(),
                name: "Screening".into(),
                sensitivity: Sensitivity::Phi,
                domain: Some("clinical".into()),
                owner_team: Some("research".into()),
                retention_policy: None,
                description: None,
            }],
            fields: vec![DatasetField {
                dataset_id: "ds-1".into(),
                field_name: "score".into(),
                data_type: "INTEGER".into(),
                is_sensitive: true,
            }],
            nodes: vec![
                LineageNode::new("db:Screening", "Screening", NodeType::Store),
                LineageNode::new("api:Screenings", "Screenings", NodeType::Process),
            ],
            edges: vec![
                LineageEdge::new("e1", "db:Screening", "api:Screenings").with_transformation("filter"),
                LineageEdge::new("e2", "api:Screenings", "db:Screening"),
            ],
            rules: vec![DataQualityRule {
                id: "r1".into(),
                dataset_id: "ds-1".into(),
                field_name: Some("score".into()),
                rule_type: RuleType::RangeCheck,
                criteria: serde_json::json!({"min": 0, "max": 100}),
                severity: Severity::Critical,
                is_active: true,
                description: None,
            }],
            users: vec!["u1".into(), "u2".into()],
            consents: vec![UserConsent {
                user_id: "u1".into(),
                consent_type: "research".into(),
                granted: true,
            }],
            access_logs: vec![
                SensitiveAccessLog {
                    user_id: "u1".into(),
                    dataset_id: Some("ds-1".into()),
                    action: "READ".into(),
                    accessed_at: Utc::now() - Duration::days(1),
                },
                SensitiveAccessLog {
                    user_id: "u2".into(),
                    dataset_id: None,
                    action: "EXPORT".into(),
                    accessed_at: Utc::now() - Duration::days(2),
                },
            ],
            ..CatalogSnapshot::default()
        }
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_through_ports() -> Result<()> {
        let store = DuckDBStore::in_memory()?;
        let report = store.load_snapshot(&snapshot())?;
        assert_eq!(report.edges, 2);

        let node = store.find_node("api:Screenings").await?.expect("node");
        assert_eq!(node.node_type, NodeType::Process);
        assert!(store.find_node("db:Nope").await?.is_none());

        let out = store.find_edges_from("db:Screening").await?;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].transformation_logic.as_deref(), Some("filter"));
        assert_eq!(store.find_edges_to("db:Screening").await?[0].id, "e2");

        let rules = store.find_rules(&RuleFilter::active()).await?;
        assert_eq!(rules[0].criteria["max"], 100);
        assert_eq!(rules[0].severity, Severity::Critical);

        assert_eq!(store.count_fields_by_dataset().await?["ds-1"], 1);
        assert_eq!(store.count_users().await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_reseeding_is_idempotent() -> Result<()> {
        let store = DuckDBStore::in_memory()?;
        let seed = snapshot();
        store.load_snapshot(&seed)?;
        store.load_snapshot(&seed)?;

        assert_eq!(store.list_nodes().await?.len(), 2);
        assert_eq!(store.list_edges().await?.len(), 2);
        assert_eq!(store.list_datasets().await?.len(), 1);
        assert_eq!(store.find_rules(&RuleFilter::active()).await?.len(), 1);
        assert_eq!(store.count_fields_by_dataset().await?["ds-1"], 1);
        assert_eq!(store.count_users().await?, 2);
        assert_eq!(store.count_consented_users().await?, 1);

        let access = store.access_counts_since(Utc::now() - Duration::days(30)).await?;
        assert_eq!(access.get("READ"), Some(&1));
        assert_eq!(access.get("EXPORT"), Some(&1));
        Ok(())
    }

    #[tokio::test]
    async fn test_reseeding_updates_dataset_in_place() -> Result<()> {
        let store = DuckDBStore::in_memory()?;
        store.load_snapshot(&snapshot())?;

        let mut changed = snapshot();
        changed.datasets[0].sensitivity = Sensitivity::Pii;
        changed.consents[0].granted = false;
        store.load_snapshot(&changed)?;

        let datasets = store.list_datasets().await?;
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].sensitivity, Sensitivity::Pii);
        assert_eq!(store.count_consented_users().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_dataset_name_taken_by_other_id_is_rejected() -> Result<()> {
        let store = DuckDBStore::in_memory()?;
        store.load_snapshot(&snapshot())?;

        let mut clash = CatalogSnapshot::default();
        let mut other = snapshot().datasets[0].clone();
        other.id = "ds-2".into();
        clash.datasets.push(other);

        let err = store.load_snapshot(&clash).unwrap_err();
        assert!(err.to_string().contains("already used"));
        assert_eq!(store.list_datasets().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_latest_result_per_rule() -> Result<()> {
        let store = DuckDBStore::in_memory()?;
        let now = Utc::now();
        let older = NewQualityResult {
            rule_id: "r1".into(),
            outcome: RuleOutcome::checked(true, 10, 2),
            execution_duration_ms: 5,
            run_date: now - Duration::minutes(5),
        };
        let newer = NewQualityResult {
            outcome: RuleOutcome::checked(false, 10, 0),
            run_date: now,
            ..older.clone()
        };

        let a = store.insert_result(&older).await?;
        let b = store.insert_result(&newer).await?;
        assert_ne!(a.id, b.id);

        let latest = store.latest_results().await?;
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, b.id);
        assert_eq!(latest[0].status, QualityStatus::Pass);

        let recent = store.recent_results("r1", 10).await?;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, b.id);

        let since = store.results_since(now - Duration::minutes(1)).await?;
        assert_eq!(since.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_one_binds_parameters() -> Result<()> {
        let store = DuckDBStore::in_memory()?;
        store.execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (1), (5), (NULL), (12);")?;

        let query = SqlQuery {
            sql: "SELECT COUNT(*) AS total, SUM(CASE WHEN v > ? THEN 1 ELSE 0 END) AS above FROM t".into(),
            params: vec![SqlParam::Float(4.0)],
        };
        let row = store.fetch_one(&query).await?.expect("row");
        assert_eq!(row.get_count("total"), Some(4));
        assert_eq!(row.get_count("above"), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_interrupted_query_releases_connection() -> Result<()> {
        let store = DuckDBStore::in_memory()?;
        let slow = SqlQuery::read_only(
            "SELECT COUNT(*) AS failures FROM range(100000) AS a(x), range(100000) AS b(y) WHERE (a.x + b.y) % 7 = 3",
        )?;

        let started = std::time::Instant::now();
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(50), store.fetch_one(&slow)).await;
        assert!(timed_out.is_err());

        // The abandoned statement is interrupted, so the next one gets the connection quickly.
        let row = store.fetch_one(&SqlQuery::read_only("SELECT 1 AS one")?).await?.expect("row");
        assert_eq!(row.get_count("one"), Some(1));
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_one_surfaces_missing_table() -> Result<()> {
        let store = DuckDBStore::in_memory()?;
        let query = SqlQuery {
            sql: "SELECT COUNT(*) FROM non_existent_table".into(),
            params: vec![],
        };
        assert!(store.fetch_one(&query).await.is_err());
        Ok(())
    }
}
