//! Anthropic Claude API collaborator (non-streaming messages API)
//!
//! RECC consumes whole responses, so this client uses the plain
//! messages endpoint rather than SSE. History lives client-side: the
//! collaborator keeps the running conversation and `reset_history`
//! clears it.

use crate::collaborator::{CollabError, CollabResult, Collaborator};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicCollaborator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    system: Option<String>,
    history: Mutex<Vec<ApiMessage>>,
}

impl AnthropicCollaborator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
            model: model.into(),
            max_tokens: 1024,
            system: None,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait::async_trait]
impl Collaborator for AnthropicCollaborator {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate(&self, prompt: &str, reset_history: bool) -> CollabResult<String> {
        let mut history = self.history.lock().await;
        if reset_history {
            history.clear();
        }
        history.push(ApiMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let body = ApiRequest {
            model: self.model.clone(),
            messages: history.clone(),
            max_tokens: self.max_tokens,
            system: self.system.clone(),
        };

        debug!("anthropic request: model={} turns={}", body.model, body.messages.len());

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Drop the user turn we never got an answer for
            history.pop();
            let error_text = response.text().await.unwrap_or_default();
            error!("anthropic error {}: {}", status, error_text);

            return Err(match status.as_u16() {
                401 => CollabError::AuthFailed(error_text),
                429 => CollabError::RateLimited {
                    retry_after_ms: 60_000,
                },
                _ => CollabError::RequestFailed(format!("{}: {}", status, error_text)),
            });
        }

        let parsed: ApiResponse = response.json().await?;
        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            history.pop();
            return Err(CollabError::InvalidResponse(
                "response contained no text blocks".to_string(),
            ));
        }

        history.push(ApiMessage {
            role: "assistant".to_string(),
            content: text.clone(),
        });

        Ok(text)
    }
}

#[derive(Clone, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}
