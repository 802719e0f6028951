//! de-assistant - Data Engineer Assistant for PostgreSQL
//!
//! A thin façade over PostgreSQL with two surfaces: an HTTP API (database
//! tester, port discovery, chat relay, static front end) and a CLI
//! (connection test, table listing, table preview, ad-hoc queries).
//!
//! # Core Principles
//! - One connection per operation, always closed, never pooled
//! - Identifiers are quoted, never interpolated raw
//! - Results normalize to one transport-safe shape ([`QueryOutput`])
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`config`] - Environment-driven configuration
//! - [`engine`] - Session traits, result types, the PostgreSQL driver
//! - [`query`] - Statement classification and the identifier-safe query builder
//! - [`operations`] - The operations both surfaces expose
//! - [`discovery`] - Best-effort TCP port probe
//! - [`chat`] - Chat relay with stub fallback
//! - [`output`] - HTTP wire types
//! - [`server`] - axum router
//! - [`table`] - CLI text tables

pub mod chat;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod operations;
pub mod output;
pub mod query;
pub mod server;
pub mod table;

pub use config::{load_config, ChatSettings, ServerSettings};
pub use engine::postgres::PostgresConnector;
pub use engine::{
    with_connection, CommandOutcome, ConnectionParameters, Connector, QueryOutput, ResultSet, Session, Value,
};
pub use error::{AssistantError, Result};
pub use operations::{fetch_head, list_tables, run_query, test_connection, ConnectionCheck};
pub use query::{quote_identifier, wrap_with_row_limit, TableRef};
pub use server::{router, AppState};
