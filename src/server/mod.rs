//! HTTP Surface
//!
//! axum router exposing the health check, the database tester, the port
//! discovery probe, the chat relay and the static front end.
//!
//! # Routes
//! - `GET /` and `GET /static/{*path}`: front-end assets
//! - `GET /api/ping`
//! - `POST /api/db/test`: run one statement against a caller-supplied URL
//! - `GET /api/db/discover`: best-effort local port scan
//! - `POST /api/chat`: relay a message to the chat agent
//!
//! Handlers share [`AppState`]; every database call opens and closes its own
//! connection through the state's [`Connector`].

use std::path::{Component, Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::chat::ChatAgent;
use crate::config::ChatSettings;
use crate::discovery::DiscoverySettings;
use crate::engine::{ConnectionParameters, Connector};
use crate::error::{AssistantError, Result};
use crate::operations;
use crate::output::{
    ChatRequest, ChatResponse, DbTestRequest, DbTestResponse, DiscoverResponse, ErrorBody, PingResponse,
};

const FRONT_NOT_FOUND: &str = "<h1>Front not found</h1>";

/// Shared, immutable handler state plus the lazily built chat agent
pub struct AppState<C> {
    connector: Arc<C>,
    static_dir: Arc<PathBuf>,
    discovery: Arc<DiscoverySettings>,
    env_url: Option<String>,
    chat_settings: Arc<ChatSettings>,
    chat: Arc<OnceCell<ChatAgent>>,
}

// Manual impl: a derive would demand `C: Clone`.
impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            static_dir: Arc::clone(&self.static_dir),
            discovery: Arc::clone(&self.discovery),
            env_url: self.env_url.clone(),
            chat_settings: Arc::clone(&self.chat_settings),
            chat: Arc::clone(&self.chat),
        }
    }
}

impl<C: Connector> AppState<C> {
    pub fn new(connector: C, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            connector: Arc::new(connector),
            static_dir: Arc::new(static_dir.into()),
            discovery: Arc::new(DiscoverySettings::default()),
            env_url: None,
            chat_settings: Arc::new(ChatSettings::default()),
            chat: Arc::new(OnceCell::new()),
        }
    }

    #[must_use]
    pub fn with_discovery(mut self, settings: DiscoverySettings) -> Self {
        self.discovery = Arc::new(settings);
        self
    }

    /// `DATABASE_URL` value echoed back by the discovery endpoint
    #[must_use]
    pub fn with_env_url(mut self, env_url: Option<String>) -> Self {
        self.env_url = env_url;
        self
    }

    /// Settings the chat agent is built from on first use
    #[must_use]
    pub fn with_chat_settings(mut self, settings: ChatSettings) -> Self {
        self.chat_settings = Arc::new(settings);
        self
    }

    /// Use an already built agent instead of building one lazily
    #[must_use]
    pub fn with_chat_agent(mut self, agent: ChatAgent) -> Self {
        self.chat = Arc::new(OnceCell::new_with(Some(agent)));
        self
    }

    /// The chat agent, built from the settings on the first call
    pub async fn chat_agent(&self) -> &ChatAgent {
        self.chat
            .get_or_init(|| async { ChatAgent::from_settings(&self.chat_settings) })
            .await
    }
}

/// An [`AssistantError`] rendered as `{"detail": ...}`
#[derive(Debug)]
pub struct ApiError(pub AssistantError);

impl From<AssistantError> for ApiError {
    fn from(err: AssistantError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AssistantError::invalid_input(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            warn!(code = self.0.error_code(), error = %self.0, "request failed");
            StatusCode::BAD_REQUEST
        } else {
            error!(code = self.0.error_code(), error = %self.0, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(ErrorBody::from_error(&self.0))).into_response()
    }
}

/// Build the application router
pub fn router<C: Connector + 'static>(state: AppState<C>) -> Router {
    Router::new()
        .route("/", get(index::<C>))
        .route("/static/{*path}", get(static_file::<C>))
        .route("/api/ping", get(ping))
        .route("/api/db/test", post(db_test::<C>))
        .route("/api/db/discover", get(db_discover::<C>))
        .route("/api/chat", post(chat::<C>))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C
pub async fn serve<C: Connector + 'static>(state: AppState<C>, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
}

async fn ping() -> Json<PingResponse> {
    Json(PingResponse::ok())
}

async fn db_test<C: Connector + 'static>(
    State(state): State<AppState<C>>,
    payload: std::result::Result<Json<DbTestRequest>, JsonRejection>,
) -> std::result::Result<Json<DbTestResponse>, ApiError> {
    let Json(request) = payload?;
    let params = ConnectionParameters::from_url(request.url()?)?;
    let sql = request.query();
    info!(host = %params.host, port = params.port, dbname = %params.dbname, "testing database URL");

    let output = operations::run_query(state.connector.as_ref(), &params, sql, None).await?;
    Ok(Json(DbTestResponse::from(output)))
}

async fn db_discover<C: Connector + 'static>(State(state): State<AppState<C>>) -> Json<DiscoverResponse> {
    let report = state.discovery.run().await;
    info!(open = report.open.len(), "discovery finished");
    Json(DiscoverResponse::new(state.env_url.clone(), report))
}

async fn chat<C: Connector + 'static>(
    State(state): State<AppState<C>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> std::result::Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;
    let message = request.message()?;

    let reply = state.chat_agent().await.reply(message).await;
    Ok(Json(ChatResponse { reply, echo: message.to_string() }))
}

async fn index<C: Connector + 'static>(State(state): State<AppState<C>>) -> Response {
    let path = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "front end not available");
            (StatusCode::NOT_FOUND, Html(FRONT_NOT_FOUND)).into_response()
        }
    }
}

async fn static_file<C: Connector + 'static>(
    State(state): State<AppState<C>>,
    Path(path): Path<String>,
) -> Response {
    let Some(relative) = safe_relative_path(&path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match tokio::fs::read(state.static_dir.join(relative)).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type(relative))], bytes).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// `path` if it stays inside the static directory
fn safe_relative_path(path: &str) -> Option<&FsPath> {
    let candidate = FsPath::new(path);
    let mut components = candidate.components().peekable();
    components.peek()?;
    components
        .all(|c| matches!(c, Component::Normal(_)))
        .then_some(candidate)
}

fn content_type(path: &FsPath) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
