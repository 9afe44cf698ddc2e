//! Completion Service trait
//!
//! Abstraction over the natural-language completion service used to write
//! friendly confirmation and reminder copy. The core never depends on the
//! wording the service returns; callers always keep a static fallback.
//!
//! # Example
//!
//! ```ignore
//! use expense_agent_core::traits::{CompletionRequest, CompletionService};
//!
//! let request = CompletionRequest::new("Confirme a despesa: mercado, Supermercado, pix")
//!     .with_system("Você é um assistente financeiro.")
//!     .with_max_tokens(60);
//! let text = service.complete(&request).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured request for the completion service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Instructions for the model
    pub system: Option<String>,
    /// User prompt
    pub prompt: String,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: 80,
            temperature: 0.4,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Completion failures
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Request(String),

    #[error("completion timed out after {0} ms")]
    Timeout(u64),

    #[error("completion service returned an empty response")]
    EmptyResponse,

    #[error("unexpected completion response: {0}")]
    InvalidResponse(String),
}

/// Natural-language completion service
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Generate text for the request
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;

    /// Service name for logs
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoService;

    #[async_trait]
    impl CompletionService for EchoService {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
            Ok(request.prompt.to_uppercase())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::new("oi")
            .with_system("sys")
            .with_max_tokens(10)
            .with_temperature(0.0);
        assert_eq!(request.system.as_deref(), Some("sys"));
        assert_eq!(request.max_tokens, 10);
        assert_eq!(request.temperature, 0.0);
    }

    #[tokio::test]
    async fn test_service_object_safety() {
        let service: Box<dyn CompletionService> = Box::new(EchoService);
        let out = service.complete(&CompletionRequest::new("ok")).await.unwrap();
        assert_eq!(out, "OK");
        assert_eq!(service.name(), "echo");
    }
}
