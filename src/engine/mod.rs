//! Database Engine Traits and Core Types
//!
//! This module defines the core abstractions over a database session and the
//! uniform, transport-safe shape results are normalized into.
//!
//! # Stateless Design
//! Nothing is pooled or cached. Every operation goes through
//! [`with_connection`], which opens one session, hands it to the operation
//! and closes it again on every exit path.
//!
//! # Seams
//! - [`Connector`] opens sessions from [`ConnectionParameters`]
//! - [`Session`] runs row-returning statements and commands, then closes
//!
//! The production implementation lives in [`postgres`]; tests supply
//! in-memory fakes.

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::error::{AssistantError, Result};

pub mod postgres;

/// Parameters needed to open a database session
///
/// Reconstructed per call, either from the environment
/// ([`crate::config::load_config`]) or from a connection URL
/// ([`ConnectionParameters::from_url`]).
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParameters {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    /// WARNING: Sensitive data, never logged (see the `Debug` impl)
    pub password: String,
    /// libpq-style SSL mode (`disable`, `prefer`, `require`)
    pub sslmode: Option<String>,
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("sslmode", &self.sslmode)
            .finish()
    }
}

/// A single result cell
///
/// Null is a distinct value; turning it into an empty string is the
/// presentation layer's job.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    /// ISO 8601 rendering of a date, time or timestamp
    Timestamp(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert to a JSON value (BYTEA as Base64, NaN/Infinity as null)
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use base64::Engine;

        match self {
            Self::Null => serde_json::Value::Null,
            Self::Integer(v) => serde_json::Value::Number((*v).into()),
            Self::Float(v) => serde_json::Number::from_f64(*v)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Text(v) | Self::Timestamp(v) => serde_json::Value::String(v.clone()),
            Self::Boolean(v) => serde_json::Value::Bool(*v),
            Self::Bytes(v) => {
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(v))
            }
            Self::Json(v) => v.clone(),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Text rendering used by the CLI table. Null renders as an empty string.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) | Self::Timestamp(v) => f.write_str(v),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Bytes(v) => {
                f.write_str("\\x")?;
                for byte in v {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

/// Rows produced by a row-returning statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    /// Column names in engine order
    pub columns: Vec<String>,

    /// Rows, each aligned positionally with `columns`
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Build a result set, checking every row is as wide as the column list
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(AssistantError::internal(format!(
                "row {idx} has {} values but the result has {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows as JSON objects keyed by column name, in column order
    ///
    /// Duplicate column names collapse; the rightmost value wins.
    #[must_use]
    pub fn to_records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect()
            })
            .collect()
    }
}

/// Completion status of a statement that does not return rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    /// e.g. `INSERT 3`, `CREATE TABLE 0`
    pub status: String,
}

impl CommandOutcome {
    #[must_use]
    pub fn new(status: impl Into<String>) -> Self {
        Self { status: status.into() }
    }
}

/// Outcome of one successful statement: exactly one of rows or a command status
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Rows(ResultSet),
    Command(CommandOutcome),
}

impl QueryOutput {
    /// Column metadata; `None` means this is a command outcome
    #[must_use]
    pub fn columns(&self) -> Option<&[String]> {
        match self {
            Self::Rows(set) => Some(&set.columns),
            Self::Command(_) => None,
        }
    }

    #[must_use]
    pub const fn as_rows(&self) -> Option<&ResultSet> {
        match self {
            Self::Rows(set) => Some(set),
            Self::Command(_) => None,
        }
    }

    #[must_use]
    pub const fn as_command(&self) -> Option<&CommandOutcome> {
        match self {
            Self::Rows(_) => None,
            Self::Command(outcome) => Some(outcome),
        }
    }
}

/// One live database session, owned exclusively by the operation that opened it
pub trait Session: Send {
    /// Execute a row-returning statement and fetch every row eagerly
    fn fetch_rows(&mut self, sql: &str) -> impl Future<Output = Result<ResultSet>> + Send;

    /// Execute a statement that does not return rows; yields the affected row count
    fn run_command(&mut self, sql: &str) -> impl Future<Output = Result<u64>> + Send;

    /// Release the session
    fn close(self) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized;
}

/// Opens sessions
pub trait Connector: Send + Sync {
    type Session: Session;

    /// Open a session; failures are `ConnectionFailed` with the driver message
    fn connect(
        &self,
        params: &ConnectionParameters,
    ) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// Run `body` with a freshly opened session and close it afterwards
///
/// The session is closed exactly once whether `body` succeeds or fails. A
/// failure while closing is logged and dropped so it never replaces the
/// body's own result.
///
/// ```ignore
/// let sql = sql.to_owned();
/// let output = with_connection(&connector, &params, move |session| {
///     Box::pin(async move { execute(session, &sql).await })
/// })
/// .await?;
/// ```
pub async fn with_connection<C, T, F>(
    connector: &C,
    params: &ConnectionParameters,
    body: F,
) -> Result<T>
where
    C: Connector,
    T: Send,
    F: for<'s> FnOnce(&'s mut C::Session) -> BoxFuture<'s, Result<T>> + Send,
{
    debug!(host = %params.host, port = params.port, dbname = %params.dbname, "opening session");
    let mut session = connector.connect(params).await?;

    let outcome = body(&mut session).await;

    if let Err(e) = session.close().await {
        warn!(error = %e, "failed to close database session");
    }

    outcome
}
