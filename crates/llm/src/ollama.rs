//! Ollama completion client
//!
//! Non-streaming `POST {endpoint}/api/generate`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use expense_agent_config::CompletionSettings;
use expense_agent_core::{CompletionError, CompletionRequest, CompletionService};

/// Client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

impl From<&CompletionSettings> for OllamaConfig {
    fn from(settings: &CompletionSettings) -> Self {
        Self {
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            timeout: Duration::from_millis(settings.timeout_ms),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::from(&CompletionSettings::default())
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Completion service backed by an Ollama server
#[derive(Debug, Clone)]
pub struct OllamaCompletionService {
    config: OllamaConfig,
    client: Client,
}

impl OllamaCompletionService {
    pub fn new(config: OllamaConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CompletionError::Request(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn url(&self) -> String {
        format!("{}/api/generate", self.config.endpoint)
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.config.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            stream: false,
            options: GenerateOptions {
                num_predict: request.max_tokens,
                temperature: request.temperature,
            },
        }
    }
}

fn extract_text(response: GenerateResponse) -> Result<String, CompletionError> {
    let text = response.response.trim();
    if text.is_empty() {
        return Err(CompletionError::EmptyResponse);
    }
    Ok(text.to_string())
}

#[async_trait]
impl CompletionService for OllamaCompletionService {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        tracing::debug!(model = %self.config.model, "Requesting completion");

        let response = self
            .client
            .post(self.url())
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout(self.config.timeout.as_millis() as u64)
                } else {
                    CompletionError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::Request(format!("HTTP {}", status)));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;
        extract_text(parsed)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
