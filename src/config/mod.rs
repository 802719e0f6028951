//! Configuration Management
//!
//! All configuration comes from environment variables. A `.env` file in the
//! working directory is loaded once at startup by the binary (existing
//! variables win); nothing in this module mutates the process environment.
//!
//! # Database (CLI path)
//! | Variable | Default |
//! |---|---|
//! | `DB_HOST` | `localhost` |
//! | `DB_PORT` | `5432` |
//! | `DB_NAME` | `postgres` |
//! | `DB_USER` | `postgres` |
//! | `DB_PASSWORD` | `postgres` |
//! | `DB_SSLMODE` | unset |
//!
//! `DATABASE_URL` is only reported by the discovery endpoint.
//!
//! # HTTP server
//! `APP_HOST` (`0.0.0.0`), `APP_PORT` (`8000`), `APP_STATIC_DIR` (`static`).
//!
//! # Chat collaborator
//! `OPENAI_API_KEY` (unset disables the model), `OPENAI_MODEL`, `OPENAI_BASE_URL`.
//!
//! Every loader has a `*_from` variant taking a lookup function so tests can
//! supply variables without touching the real environment.

use std::path::PathBuf;

use tracing::debug;

use crate::engine::ConnectionParameters;
use crate::error::{AssistantError, Result};

pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_NAME: &str = "postgres";
pub const DEFAULT_DB_USER: &str = "postgres";
pub const DEFAULT_DB_PASSWORD: &str = "postgres";

pub const DEFAULT_APP_HOST: &str = "0.0.0.0";
pub const DEFAULT_APP_PORT: u16 = 8000;
pub const DEFAULT_STATIC_DIR: &str = "static";

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CHAT_BASE_URL: &str = "https://api.openai.com/v1";

/// Read an environment variable, treating non-UTF-8 values as unset
fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Load `.env` into the process environment without overriding existing variables
///
/// Called once by the binary before anything reads configuration.
pub fn load_dotenv() {
    match dotenv::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env file"),
        Err(e) => debug!(error = %e, "no .env file loaded"),
    }
}

/// Resolve database connection parameters from the environment
pub fn load_config() -> Result<ConnectionParameters> {
    load_config_from(env_lookup)
}

/// Resolve database connection parameters from an arbitrary variable lookup
pub fn load_config_from<F>(lookup: F) -> Result<ConnectionParameters>
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("DB_HOST").unwrap_or_else(|| DEFAULT_DB_HOST.to_string());
    let port = match lookup("DB_PORT") {
        Some(raw) => parse_port("DB_PORT", &raw)?,
        None => DEFAULT_DB_PORT,
    };
    let dbname = lookup("DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.to_string());
    let user = lookup("DB_USER").unwrap_or_else(|| DEFAULT_DB_USER.to_string());
    let password = lookup("DB_PASSWORD").unwrap_or_else(|| DEFAULT_DB_PASSWORD.to_string());
    let sslmode = lookup("DB_SSLMODE").filter(|mode| !mode.trim().is_empty());

    Ok(ConnectionParameters { host, port, dbname, user, password, sslmode })
}

/// `DATABASE_URL` from the environment, if set and non-empty
pub fn database_url() -> Option<String> {
    database_url_from(env_lookup)
}

pub fn database_url_from<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup("DATABASE_URL").filter(|url| !url.trim().is_empty())
}

fn parse_port(name: &str, raw: &str) -> Result<u16> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| AssistantError::config_error(format!("{name} must be an integer, got: {raw}")))?;

    u16::try_from(value).map_err(|_| {
        AssistantError::config_error(format!("{name} must be between 0 and 65535, got: {raw}"))
    })
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Directory holding `index.html` and other front-end assets
    pub static_dir: PathBuf,
}

impl ServerSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("APP_HOST").unwrap_or_else(|| DEFAULT_APP_HOST.to_string());
        let port = match lookup("APP_PORT") {
            Some(raw) => parse_port("APP_PORT", &raw)?,
            None => DEFAULT_APP_PORT,
        };
        let static_dir =
            PathBuf::from(lookup("APP_STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()));

        Ok(Self { host, port, static_dir })
    }

    /// `host:port` string suitable for binding a listener
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Settings for the OpenAI-compatible chat collaborator
#[derive(Clone, PartialEq, Eq)]
pub struct ChatSettings {
    /// API key; `None` means the model is not configured and the stub answers
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl std::fmt::Debug for ChatSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_CHAT_MODEL.to_string(),
            base_url: DEFAULT_CHAT_BASE_URL.to_string(),
        }
    }
}

impl ChatSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY").filter(|key| !key.trim().is_empty());
        let model = lookup("OPENAI_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string());
        let base_url = lookup("OPENAI_BASE_URL")
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CHAT_BASE_URL.to_string());

        Self { api_key, model, base_url }
    }
}
