//! JSON Wire Types
//!
//! Request and response bodies of the HTTP surface. Field names are part of
//! the contract the browser front end reads, so they are pinned here with
//! serde attributes rather than left to Rust naming.
//!
//! # Output Contract
//! - Row results: `{"ok": true, "rows": [{...}], "rowCount": n}`
//! - Command results: `{"ok": true, "status": "INSERT 1"}`
//! - Errors: `{"detail": "..."}` with a 4xx/5xx status

use serde::{Deserialize, Serialize};

use crate::discovery::{DiscoveryReport, Endpoint, DISCOVERY_NOTE};
use crate::engine::QueryOutput;
use crate::error::{AssistantError, Result};

/// Statement `POST /api/db/test` runs when the body names none
pub const DEFAULT_TEST_QUERY: &str = "select 1 as ok";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
}

impl PingResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self { status: "ok".to_string() }
    }
}

/// Body of `POST /api/db/test`
///
/// `url` is optional at the serde level so a missing field becomes a 400
/// with a readable message instead of a deserialization rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DbTestRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
}

impl DbTestRequest {
    /// The non-blank connection URL
    pub fn url(&self) -> Result<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AssistantError::invalid_input("url is required"))
    }

    /// The statement to run; blank falls back to [`DEFAULT_TEST_QUERY`]
    #[must_use]
    pub fn query(&self) -> &str {
        self.query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .unwrap_or(DEFAULT_TEST_QUERY)
    }
}

/// Response of `POST /api/db/test`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DbTestResponse {
    Rows {
        ok: bool,
        rows: Vec<serde_json::Map<String, serde_json::Value>>,
        #[serde(rename = "rowCount")]
        row_count: usize,
    },
    Status {
        ok: bool,
        status: String,
    },
}

impl From<QueryOutput> for DbTestResponse {
    fn from(output: QueryOutput) -> Self {
        match output {
            QueryOutput::Rows(result) => Self::Rows {
                ok: true,
                rows: result.to_records(),
                row_count: result.row_count(),
            },
            QueryOutput::Command(outcome) => Self::Status { ok: true, status: outcome.status },
        }
    }
}

/// Response of `GET /api/db/discover`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverResponse {
    pub ok: bool,
    pub env_url: Option<String>,
    pub open: Vec<Endpoint>,
    pub suggested_urls: Vec<String>,
    pub note: String,
}

impl DiscoverResponse {
    #[must_use]
    pub fn new(env_url: Option<String>, report: DiscoveryReport) -> Self {
        Self {
            ok: true,
            env_url,
            open: report.open,
            suggested_urls: report.suggested_urls,
            note: DISCOVERY_NOTE.to_string(),
        }
    }
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

impl ChatRequest {
    /// The non-blank message, untrimmed
    pub fn message(&self) -> Result<&str> {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| AssistantError::invalid_input("message must not be empty"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub echo: String,
}

/// Error body for every non-2xx API response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    /// Client errors carry the bare cause; server errors the full message
    #[must_use]
    pub fn from_error(err: &AssistantError) -> Self {
        let detail = if err.is_client_error() { err.detail().to_string() } else { err.message() };
        Self { detail }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CommandOutcome, ResultSet, Value};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_db_test_request_defaults() {
        let req: DbTestRequest = serde_json::from_str(r#"{"url": "postgres://u:p@h/db"}"#).unwrap();
        assert_eq!(req.url().unwrap(), "postgres://u:p@h/db");
        assert_eq!(req.query(), DEFAULT_TEST_QUERY);

        let req: DbTestRequest = serde_json::from_str(r#"{"url": "x", "query": "   "}"#).unwrap();
        assert_eq!(req.query(), DEFAULT_TEST_QUERY);
    }

    #[test]
    fn test_db_test_request_missing_or_blank_url() {
        for body in [r#"{}"#, r#"{"url": ""}"#, r#"{"url": "  "}"#, r#"{"url": null}"#] {
            let req: DbTestRequest = serde_json::from_str(body).unwrap();
            let err = req.url().unwrap_err();
            assert_eq!(err.error_code(), "INVALID_INPUT", "body: {body}");
        }
    }

    #[test]
    fn test_rows_response_shape() {
        let result = ResultSet::new(
            vec!["ok".to_string(), "label".to_string()],
            vec![vec![Value::Integer(1), Value::Null]],
        )
        .unwrap();
        let json = serde_json::to_string(&DbTestResponse::from(QueryOutput::Rows(result))).unwrap();
        insta::assert_snapshot!(json, @r#"{"ok":true,"rows":[{"ok":1,"label":null}],"rowCount":1}"#);
    }

    #[test]
    fn test_status_response_shape() {
        let output = QueryOutput::Command(CommandOutcome::new("CREATE TABLE 0"));
        let json = serde_json::to_string(&DbTestResponse::from(output)).unwrap();
        insta::assert_snapshot!(json, @r#"{"ok":true,"status":"CREATE TABLE 0"}"#);
    }

    #[test]
    fn test_discover_response_is_camel_case() {
        let report = DiscoveryReport {
            open: vec![Endpoint { host: "localhost".to_string(), port: 5432 }],
            suggested_urls: vec!["postgres://<user>:<password>@localhost:5432/<database>".to_string()],
        };
        let value = serde_json::to_value(DiscoverResponse::new(None, report)).unwrap();

        assert_eq!(value["ok"], true);
        assert!(value["envUrl"].is_null());
        assert_eq!(value["open"][0]["host"], "localhost");
        assert_eq!(value["open"][0]["port"], 5432);
        assert_eq!(value["suggestedUrls"][0], "postgres://<user>:<password>@localhost:5432/<database>");
        assert_eq!(value["note"], DISCOVERY_NOTE);
    }

    #[test]
    fn test_chat_request_validation() {
        let req: ChatRequest = serde_json::from_str(r#"{"message": "hi"}"#).unwrap();
        assert_eq!(req.message().unwrap(), "hi");

        let req: ChatRequest = serde_json::from_str(r#"{"message": " \n"}"#).unwrap();
        assert!(req.message().is_err());
        assert!(ChatRequest::default().message().is_err());
    }

    #[test]
    fn test_error_body_detail() {
        let client = ErrorBody::from_error(&AssistantError::query_failed("relation \"nope\" does not exist"));
        assert_eq!(client.detail, "relation \"nope\" does not exist");

        let server = ErrorBody::from_error(&AssistantError::internal("join error"));
        assert_eq!(server.detail, "Internal error: join error");
    }
}
