//! Shared test fixtures: an in-memory connector that understands the
//! statements this crate generates.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use de_assistant::{AssistantError, ConnectionParameters, Connector, ResultSet, Result, Session, Value};

#[derive(Default)]
struct FakeDb {
    /// Exact statement text -> rows
    queries: HashMap<String, ResultSet>,
    /// Quoted `"schema"."table"` -> rows
    tables: HashMap<String, ResultSet>,
    /// Affected-row count reported for every command
    affected: u64,
    refuse: bool,
    statements: Mutex<Vec<String>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
}

/// Cloneable fake; clones share state so tests can inspect it after handing
/// the connector to a router.
#[derive(Clone, Default)]
pub struct FakeConnector {
    db: Arc<FakeDb>,
}

pub struct FakeBuilder {
    db: FakeDb,
}

impl FakeConnector {
    pub fn builder() -> FakeBuilder {
        FakeBuilder { db: FakeDb::default() }
    }

    pub fn statements(&self) -> Vec<String> {
        self.db.statements.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.db.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.db.closes.load(Ordering::SeqCst)
    }
}

impl FakeBuilder {
    pub fn query(mut self, sql: &str, result: ResultSet) -> Self {
        self.db.queries.insert(sql.to_string(), result);
        self
    }

    pub fn table(mut self, schema: &str, table: &str, result: ResultSet) -> Self {
        self.db.tables.insert(format!("\"{schema}\".\"{table}\""), result);
        self
    }

    pub fn affected(mut self, affected: u64) -> Self {
        self.db.affected = affected;
        self
    }

    pub fn refuse_connections(mut self) -> Self {
        self.db.refuse = true;
        self
    }

    pub fn build(self) -> FakeConnector {
        FakeConnector { db: Arc::new(self.db) }
    }
}

pub struct FakeSession {
    db: Arc<FakeDb>,
}

impl FakeSession {
    fn lookup(&self, sql: &str) -> Result<ResultSet> {
        if let Some((inner, limit)) = split_limit(sql, "select * from (", ") as subquery limit ") {
            return self.lookup(inner).map(|set| truncate(set, limit));
        }
        if let Some((relation, limit)) = split_limit(sql, "select * from ", " limit ") {
            if let Some(set) = self.db.tables.get(relation) {
                return Ok(truncate(set.clone(), limit));
            }
            return Err(AssistantError::query_failed(format!("relation {relation} does not exist")));
        }
        self.db
            .queries
            .get(sql)
            .cloned()
            .ok_or_else(|| AssistantError::query_failed(format!("syntax error at or near \"{sql}\"")))
    }
}

fn split_limit<'a>(sql: &'a str, prefix: &str, infix: &str) -> Option<(&'a str, usize)> {
    let rest = sql.strip_prefix(prefix)?;
    let (body, limit) = rest.rsplit_once(infix)?;
    Some((body, limit.parse().ok()?))
}

fn truncate(set: ResultSet, limit: usize) -> ResultSet {
    let rows = set.rows.into_iter().take(limit).collect();
    ResultSet::new(set.columns, rows).unwrap()
}

impl Session for FakeSession {
    async fn fetch_rows(&mut self, sql: &str) -> Result<ResultSet> {
        self.db.statements.lock().unwrap().push(sql.to_string());
        self.lookup(sql)
    }

    async fn run_command(&mut self, sql: &str) -> Result<u64> {
        self.db.statements.lock().unwrap().push(sql.to_string());
        Ok(self.db.affected)
    }

    async fn close(self) -> Result<()> {
        self.db.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Connector for FakeConnector {
    type Session = FakeSession;

    async fn connect(&self, params: &ConnectionParameters) -> Result<FakeSession> {
        self.db.connects.fetch_add(1, Ordering::SeqCst);
        if self.db.refuse {
            return Err(AssistantError::connection_failed(format!(
                "connection to server at \"{}\", port {} failed: Connection refused",
                params.host, params.port
            )));
        }
        Ok(FakeSession { db: Arc::clone(&self.db) })
    }
}

/// Single-column integer result
pub fn int_column(name: &str, values: &[i64]) -> ResultSet {
    ResultSet::new(vec![name.to_string()], values.iter().map(|v| vec![Value::Integer(*v)]).collect()).unwrap()
}

pub fn params() -> ConnectionParameters {
    de_assistant::config::load_config_from(|_| None).unwrap()
}

/// Fresh, empty directory under the system temp dir
pub fn temp_dir(label: &str) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!("de_assistant_{label}_{}_{id}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
