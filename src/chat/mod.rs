//! Chat Relay
//!
//! Relays a single user message to an OpenAI-compatible chat completions
//! endpoint. The model is an optional collaborator: when no API key is
//! configured, or the call fails for any reason, [`ChatAgent::reply`]
//! answers with a stub that describes the failure instead of erroring.
//!
//! One blocking call per message; retries and timeouts beyond the client
//! default belong to the provider.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ChatSettings;
use crate::error::{AssistantError, Result};

const SYSTEM_PROMPT: &str = "You are a data engineering assistant. Help with SQL, PostgreSQL \
     and data pipeline questions. Answer concisely.";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AssistantError::chat_failed(format!("could not build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Ask the model; any transport, status or shape problem is `ChatFailed`
    pub async fn complete(&self, message: &str) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: message },
            ],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::chat_failed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::chat_failed(format!("provider returned {status}: {body}")));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::chat_failed(format!("unreadable response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AssistantError::chat_failed("response contained no message"))
    }
}

/// The chat node: an optional model plus the stub fallback
#[derive(Debug, Clone)]
pub struct ChatAgent {
    model: Option<OpenAiChat>,
}

impl ChatAgent {
    /// Agent that always answers with the stub
    #[must_use]
    pub const fn stub() -> Self {
        Self { model: None }
    }

    #[must_use]
    pub const fn with_model(model: OpenAiChat) -> Self {
        Self { model: Some(model) }
    }

    /// Build from settings; a missing key or client failure degrades to the stub
    #[must_use]
    pub fn from_settings(settings: &ChatSettings) -> Self {
        let Some(key) = &settings.api_key else {
            info!("OPENAI_API_KEY not set; chat answers with the stub");
            return Self::stub();
        };

        match OpenAiChat::new(key.clone(), settings.model.clone(), &settings.base_url) {
            Ok(model) => {
                info!(model = %settings.model, "chat model configured");
                Self::with_model(model)
            }
            Err(e) => {
                warn!(error = %e, "chat model unavailable; using the stub");
                Self::stub()
            }
        }
    }

    #[must_use]
    pub const fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Reply to `message`; never fails
    pub async fn reply(&self, message: &str) -> String {
        let Some(model) = &self.model else {
            return stub_reply(message, "no language model is configured (set OPENAI_API_KEY)");
        };

        match model.complete(message).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "chat model call failed; answering with the stub");
                stub_reply(message, e.detail())
            }
        }
    }
}

fn stub_reply(message: &str, reason: &str) -> String {
    format!("[stub] The language model is unavailable: {reason}. You said: \"{message}\"")
}
