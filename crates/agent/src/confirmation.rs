//! Confirmation copy
//!
//! The reply sent after a transaction is saved. A completion service may
//! phrase it; any failure or timeout falls back to the static template.

use std::sync::Arc;
use std::time::Duration;

use expense_agent_config::{CompletionSettings, PromptTemplates};
use expense_agent_core::{format_brl, CompletionService, TransactionDraft};

/// Writes the confirmation message for a saved draft
#[derive(Clone)]
pub struct ConfirmationWriter {
    prompts: PromptTemplates,
    service: Option<Arc<dyn CompletionService>>,
    timeout: Duration,
    max_tokens: u32,
    temperature: f32,
}

impl ConfirmationWriter {
    /// Writer using only the static template
    pub fn new(prompts: PromptTemplates, settings: &CompletionSettings) -> Self {
        Self {
            prompts,
            service: None,
            timeout: Duration::from_millis(settings.timeout_ms),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }

    pub fn with_service(mut self, service: Arc<dyn CompletionService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn has_service(&self) -> bool {
        self.service.is_some()
    }

    /// Static confirmation text
    pub fn fallback(&self, draft: &TransactionDraft) -> String {
        self.prompts.recorded(
            &draft.description,
            &format_brl(draft.amount),
            &draft.category_name,
            draft.payment_method,
        )
    }

    pub async fn write(&self, draft: &TransactionDraft) -> String {
        let Some(service) = &self.service else {
            return self.fallback(draft);
        };

        let request = self
            .prompts
            .confirmation_request(
                &draft.description,
                &format_brl(draft.amount),
                &draft.category_name,
                draft.payment_method,
            )
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature);

        match tokio::time::timeout(self.timeout, service.complete(&request)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(Ok(_)) => self.fallback(draft),
            Ok(Err(e)) => {
                tracing::warn!(service = service.name(), error = %e, "Confirmation completion failed");
                self.fallback(draft)
            }
            Err(_) => {
                tracing::warn!(
                    service = service.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Confirmation completion timed out"
                );
                self.fallback(draft)
            }
        }
    }
}

impl std::fmt::Debug for ConfirmationWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationWriter")
            .field("service", &self.service.as_ref().map(|s| s.name().to_string()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use expense_agent_core::{
        CompletionError, CompletionRequest, PaymentMethod, ResponsibleParty,
    };

    struct Fixed(Result<String, CompletionError>);

    #[async_trait]
    impl CompletionService for Fixed {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
            self.0.clone()
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct Slow;

    #[async_trait]
    impl CompletionService for Slow {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("tarde demais".into())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn draft() -> TransactionDraft {
        TransactionDraft {
            amount: 80.0,
            description: "barbeiro".into(),
            payment_method: PaymentMethod::Pix,
            card_id: None,
            installment_plan: None,
            responsible: ResponsibleParty::Shared,
            category_id: "c1".into(),
            category_name: "Beleza".into(),
        }
    }

    fn writer() -> ConfirmationWriter {
        let settings = CompletionSettings {
            timeout_ms: 50,
            ..Default::default()
        };
        ConfirmationWriter::new(PromptTemplates::default(), &settings)
    }

    #[tokio::test]
    async fn test_static_template_without_service() {
        let text = writer().write(&draft()).await;
        assert!(text.contains("barbeiro"));
        assert!(text.contains("R$ 80,00"));
        assert!(text.contains("Beleza"));
    }

    #[tokio::test]
    async fn test_service_text_is_used() {
        let writer = writer().with_service(Arc::new(Fixed(Ok(" Anotado! ".into()))));
        assert_eq!(writer.write(&draft()).await, "Anotado!");
    }

    #[tokio::test]
    async fn test_failure_falls_back() {
        let writer = writer().with_service(Arc::new(Fixed(Err(CompletionError::EmptyResponse))));
        assert_eq!(writer.write(&draft()).await, writer.fallback(&draft()));
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let writer = writer().with_service(Arc::new(Slow));
        assert_eq!(writer.write(&draft()).await, writer.fallback(&draft()));
    }
}
