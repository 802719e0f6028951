//! Database Operations
//!
//! The operations both surfaces expose, each running inside its own
//! [`with_connection`] scope. Input validation happens before a connection
//! is opened.

use tracing::info;

use crate::engine::{with_connection, ConnectionParameters, Connector, QueryOutput, ResultSet, Session};
use crate::error::Result;
use crate::query::{self, TableRef, DEFAULT_PREVIEW_SCHEMA};

/// Outcome of a connection test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCheck {
    pub ok: bool,
    pub message: String,
}

/// Connect, run `select 1 as ok` and report; never fails
pub async fn test_connection<C: Connector>(connector: &C, params: &ConnectionParameters) -> ConnectionCheck {
    let result = with_connection(connector, params, |session| {
        Box::pin(async move { query::probe_connection(session).await })
    })
    .await;

    match result {
        Ok(true) => ConnectionCheck { ok: true, message: "Connection successful".to_string() },
        Ok(false) => ConnectionCheck {
            ok: false,
            message: "Connection established, but unexpected response".to_string(),
        },
        Err(e) => ConnectionCheck { ok: false, message: format!("Connection failed: {}", e.detail()) },
    }
}

/// List base tables, hiding system schemas unless asked or a schema is named
pub async fn list_tables<C: Connector>(
    connector: &C,
    params: &ConnectionParameters,
    include_system: bool,
    schema: Option<&str>,
) -> Result<Vec<TableRef>> {
    let schema = schema.map(str::to_string);
    with_connection(connector, params, move |session| {
        Box::pin(async move { query::list_tables(session, include_system, schema.as_deref()).await })
    })
    .await
}

/// First `limit` rows of `schema.table` (schema defaults to `public`)
pub async fn fetch_head<C: Connector>(
    connector: &C,
    params: &ConnectionParameters,
    table: &str,
    schema: Option<&str>,
    limit: i64,
) -> Result<ResultSet> {
    let stmt = query::build_preview_query(schema.unwrap_or(DEFAULT_PREVIEW_SCHEMA), table, limit)?;
    info!(statement = %stmt, "previewing table");

    with_connection(connector, params, move |session| {
        Box::pin(async move { session.fetch_rows(stmt.as_str()).await })
    })
    .await
}

/// Run ad-hoc SQL, optionally wrapped with a row limit
pub async fn run_query<C: Connector>(
    connector: &C,
    params: &ConnectionParameters,
    sql: &str,
    limit: Option<i64>,
) -> Result<QueryOutput> {
    // Validate the limit before touching the network.
    let statement = match limit {
        Some(n) => query::wrap_with_row_limit(sql, n)?.into_string(),
        None => sql.to_string(),
    };

    with_connection(connector, params, move |session| {
        Box::pin(async move { query::execute(session, &statement).await })
    })
    .await
}
