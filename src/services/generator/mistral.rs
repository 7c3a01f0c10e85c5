//! Mistral chat-completions client.

use std::{fmt, sync::Arc};

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, info_span};

use super::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeneratorError, QuizGenerator, build_prompt};

const API_KEY_ENV: &str = "MISTRAL_API_KEY";

/// Connection settings for [`MistralGenerator`].
#[derive(Clone)]
pub struct MistralConfig {
    /// Bearer token.
    pub api_key: String,
    /// Scheme, host and optional port, without the `/v1/...` path.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
}

impl fmt::Debug for MistralConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MistralConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl MistralConfig {
    /// Settings for the public endpoint and default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Point the client at another endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use another model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Read the API key from `MISTRAL_API_KEY`.
    pub fn from_env() -> Result<Self, GeneratorError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                GeneratorError::Unavailable(format!(
                    "missing environment variable `{API_KEY_ENV}`"
                ))
            })?;
        Ok(Self::new(api_key))
    }
}

/// Generator backed by the Mistral chat-completions API.
#[derive(Clone)]
pub struct MistralGenerator {
    client: Client,
    endpoint: Arc<str>,
    api_key: Arc<str>,
    model: Arc<str>,
}

impl MistralGenerator {
    /// Build the HTTP client for `config`.
    pub fn new(config: MistralConfig) -> Result<Self, GeneratorError> {
        let client = Client::builder()
            .build()
            .map_err(|err| GeneratorError::Unavailable(format!("failed to build client: {err}")))?;
        let endpoint = format!(
            "{}/v1/chat/completions",
            config.base_url.trim_end_matches('/')
        );

        Ok(Self {
            client,
            endpoint: Arc::from(endpoint),
            api_key: Arc::from(config.api_key),
            model: Arc::from(config.model),
        })
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl QuizGenerator for MistralGenerator {
    fn generate(
        &self,
        topic: &str,
        known_topics: &[String],
    ) -> BoxFuture<'static, Result<String, GeneratorError>> {
        let body = ChatRequest {
            model: self.model.to_string(),
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(topic, known_topics),
            }],
        };
        let request = self
            .client
            .post(self.endpoint.as_ref())
            .bearer_auth(self.api_key.as_ref())
            .json(&body);

        let span = info_span!("generate", model = %self.model, known = known_topics.len());

        let work = async move {
            let response = request
                .send()
                .await
                .map_err(|err| GeneratorError::Unavailable(err.to_string()))?;

            let status = response.status();
            if status != StatusCode::OK {
                let message = response.text().await.unwrap_or_default();
                return Err(GeneratorError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let payload: ChatResponse =
                response.json().await.map_err(|err| GeneratorError::Api {
                    status: status.as_u16(),
                    message: format!("failed to parse response: {err}"),
                })?;

            let content = payload
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .filter(|content| !content.trim().is_empty())
                .ok_or(GeneratorError::EmptyResponse)?;

            debug!(chars = content.len(), "generator answered");
            Ok(content)
        };

        Box::pin(work.instrument(span))
    }
}
