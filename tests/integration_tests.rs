//! PostgreSQL Integration Tests
//!
//! End-to-end runs of the operations and the HTTP router against a live
//! server. Connection settings come from `DB_*` (CLI path) and are turned
//! into a URL for the HTTP path.
//!
//! Run with: `cargo test -- --ignored` and a reachable database.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;
use tower::ServiceExt;

use de_assistant::{
    fetch_head, list_tables, load_config, router, run_query, test_connection, AppState, ConnectionParameters,
    PostgresConnector, QueryOutput, TableRef, Value,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn live_params() -> ConnectionParameters {
    de_assistant::config::load_dotenv();
    load_config().expect("DB_* variables should be valid")
}

fn live_url(params: &ConnectionParameters) -> String {
    format!(
        "postgres://{}:{}@{}:{}/{}",
        params.user, params.password, params.host, params.port, params.dbname
    )
}

/// Unique table name so parallel tests do not collide
fn scratch_table(label: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("de_assistant_{label}_{}_{id}", std::process::id())
}

async fn exec(params: &ConnectionParameters, sql: &str) -> QueryOutput {
    run_query(&PostgresConnector, params, sql, None).await.expect(sql)
}

// ============================================================================
// Operations
// ============================================================================

#[tokio::test]
#[ignore = "Requires running PostgreSQL instance"]
async fn test_live_test_connection() {
    let check = test_connection(&PostgresConnector, &live_params()).await;
    assert!(check.ok, "{}", check.message);
    assert_eq!(check.message, "Connection successful");
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL instance"]
async fn test_live_head_limit_larger_than_table() {
    let params = live_params();
    let table = scratch_table("orders");

    exec(&params, &format!("create table public.{table} (id int primary key, note text)")).await;
    let inserted = exec(&params, &format!("insert into public.{table} values (1, 'a'), (2, null), (3, 'c')")).await;
    assert_eq!(inserted.as_command().unwrap().status, "INSERT 3");

    let result = fetch_head(&PostgresConnector, &params, &table, None, 5).await;
    exec(&params, &format!("drop table public.{table}")).await;

    let result = result.unwrap();
    assert_eq!(result.columns, vec!["id", "note"]);
    assert_eq!(result.row_count(), 3);
    assert!(result.rows.iter().any(|row| row[1].is_null()));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL instance"]
async fn test_live_list_tables_schema_filter() {
    let params = live_params();
    let table = scratch_table("listed");

    exec(&params, &format!("create table public.{table} (id int)")).await;
    let tables = list_tables(&PostgresConnector, &params, false, Some("public")).await;
    exec(&params, &format!("drop table public.{table}")).await;

    let tables = tables.unwrap();
    assert!(tables.contains(&TableRef { schema: "public".to_string(), table }));
    assert!(tables.iter().all(|t| t.schema == "public"));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL instance"]
async fn test_live_system_schemas_need_opt_in() {
    let params = live_params();

    let hidden = list_tables(&PostgresConnector, &params, false, None).await.unwrap();
    let shown = list_tables(&PostgresConnector, &params, true, None).await.unwrap();

    assert!(hidden.iter().all(|t| t.schema != "pg_catalog" && t.schema != "information_schema"));
    assert!(shown.iter().any(|t| t.schema == "pg_catalog"));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL instance"]
async fn test_live_query_limit_and_types() {
    let params = live_params();
    let sql = "select n, (n::numeric / 4)::numeric(10, 2) as quarter, n % 2 = 0 as even from generate_series(1, 10) n";

    let output = run_query(&PostgresConnector, &params, sql, Some(3)).await.unwrap();
    let rows = output.as_rows().unwrap();

    assert_eq!(rows.columns, vec!["n", "quarter", "even"]);
    assert_eq!(rows.row_count(), 3);
    assert_eq!(rows.rows[0][0], Value::Integer(1));
    assert_eq!(rows.rows[0][1], Value::Text("0.25".to_string()));
    assert_eq!(rows.rows[1][2], Value::Boolean(true));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL instance"]
async fn test_live_query_interval_and_inet_are_engine_text() {
    let params = live_params();
    let output = exec(&params, "select interval '1 day' as iv, '127.0.0.1'::inet as ip").await;
    let rows = output.as_rows().unwrap();

    assert_eq!(rows.rows[0][0], Value::Text("1 day".to_string()));
    assert_eq!(rows.rows[0][1], Value::Text("127.0.0.1".to_string()));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL instance"]
async fn test_live_query_wide_numeric_is_exact() {
    let params = live_params();
    let output = exec(&params, "select 12345678901234567890.123456789::numeric as big").await;

    assert_eq!(output.as_rows().unwrap().rows[0][0], Value::Text("12345678901234567890.123456789".to_string()));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL instance"]
async fn test_live_query_error_is_engine_message() {
    let err = run_query(&PostgresConnector, &live_params(), "select * from de_assistant_missing_table", None)
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "QUERY_FAILED");
    assert!(err.detail().contains("does not exist"), "{err}");
}

// ============================================================================
// HTTP
// ============================================================================

#[tokio::test]
#[ignore = "Requires running PostgreSQL instance"]
async fn test_live_http_db_test_default_query() {
    let url = live_url(&live_params());
    let app = router(AppState::new(PostgresConnector, "static"));

    let request = Request::post("/api/db/test")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"url": url}).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"ok": true, "rows": [{"ok": 1}], "rowCount": 1}));
}
