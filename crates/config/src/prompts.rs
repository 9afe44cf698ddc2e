//! Prompt templates configuration
//!
//! Clarifying questions, reply templates and the confirmation prompt sent to
//! the completion service. Templates use `{name}` placeholders.

use serde::{Deserialize, Serialize};

use expense_agent_core::{CompletionRequest, PaymentMethod, SlotName};

/// Prompt templates configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplates {
    /// Confirmation writer persona
    #[serde(default)]
    pub system_prompt: SystemPrompt,
    /// One question per slot
    #[serde(default)]
    pub questions: SlotQuestions,
    /// Reply templates
    #[serde(default)]
    pub responses: ResponseTemplates,
    /// How payment methods are spoken
    #[serde(default)]
    pub payment_labels: PaymentLabels,
}

/// System prompt for the confirmation writer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemPrompt {
    pub role: String,
    pub guidelines: Vec<String>,
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self {
            role: "Você é um assistente de finanças pessoais que confirma despesas registradas."
                .to_string(),
            guidelines: vec![
                "Responda em português do Brasil".to_string(),
                "Use uma única frase curta e simpática".to_string(),
                "Não invente valores, datas ou nomes".to_string(),
            ],
        }
    }
}

impl SystemPrompt {
    pub fn build(&self) -> String {
        let mut prompt = format!("{}\n", self.role);
        for guideline in &self.guidelines {
            prompt.push_str(&format!("- {}\n", guideline));
        }
        prompt
    }
}

/// Clarifying question per slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotQuestions {
    pub amount: String,
    pub description: String,
    pub payment_method: String,
    pub card: String,
    pub installments: String,
    pub responsible: String,
    pub category: String,
}

impl Default for SlotQuestions {
    fn default() -> Self {
        Self {
            amount: "Qual foi o valor?".to_string(),
            description: "O que foi essa despesa? (ex.: mercado, farmácia)".to_string(),
            payment_method: "Como você pagou? (pix, débito, crédito, dinheiro)".to_string(),
            card: "Qual cartão você usou?".to_string(),
            installments: "Em quantas parcelas?".to_string(),
            responsible: "De quem é esse gasto? É seu ou compartilhado?".to_string(),
            category: "Qual a categoria?".to_string(),
        }
    }
}

impl SlotQuestions {
    pub fn for_slot(&self, slot: SlotName) -> &str {
        match slot {
            SlotName::Amount => &self.amount,
            SlotName::Description => &self.description,
            SlotName::PaymentMethod => &self.payment_method,
            SlotName::Card => &self.card,
            SlotName::Installments => &self.installments,
            SlotName::Responsible => &self.responsible,
            SlotName::Category => &self.category,
        }
    }
}

/// Reply templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseTemplates {
    /// Several records match a mention: {mention}, {options}
    pub ambiguous: String,
    /// No record matches a mention: {mention}, {options}
    pub not_found: String,
    /// Pick from a list without a prior mention: {question}, {options}
    pub choose: String,
    /// Description looked like noise: {description}
    pub invalid_description: String,
    /// Static confirmation: {description}, {amount}, {category}, {payment}
    pub recorded: String,
    /// Saving failed; the collected data is kept
    pub persistence_failure: String,
    /// Conversation discarded
    pub reset: String,
    /// Nothing to discard
    pub nothing_to_reset: String,
}

impl Default for ResponseTemplates {
    fn default() -> Self {
        Self {
            ambiguous: "Encontrei mais de uma opção para \"{mention}\": {options}. Qual delas?"
                .to_string(),
            not_found: "Não encontrei \"{mention}\". As opções são: {options}.".to_string(),
            choose: "{question} Opções: {options}.".to_string(),
            invalid_description:
                "Não entendi \"{description}\" como descrição. O que foi essa despesa?".to_string(),
            recorded: "✅ Despesa registrada: {description} ({amount}) em {category}, via {payment}."
                .to_string(),
            persistence_failure: "Desculpe, não consegui salvar sua despesa agora. Guardei os dados; me mande qualquer mensagem para tentar de novo.".to_string(),
            reset: "Tudo bem, descartei o lançamento em andamento.".to_string(),
            nothing_to_reset: "Não havia nenhum lançamento em andamento.".to_string(),
        }
    }
}

/// Spoken names of payment methods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentLabels {
    pub pix: String,
    pub debit: String,
    pub credit: String,
    pub cash: String,
    pub boleto: String,
    pub transfer: String,
}

impl Default for PaymentLabels {
    fn default() -> Self {
        Self {
            pix: "pix".to_string(),
            debit: "débito".to_string(),
            credit: "crédito".to_string(),
            cash: "dinheiro".to_string(),
            boleto: "boleto".to_string(),
            transfer: "transferência".to_string(),
        }
    }
}

impl PaymentLabels {
    pub fn label(&self, method: PaymentMethod) -> &str {
        match method {
            PaymentMethod::Pix => &self.pix,
            PaymentMethod::Debit => &self.debit,
            PaymentMethod::Credit => &self.credit,
            PaymentMethod::Cash => &self.cash,
            PaymentMethod::Boleto => &self.boleto,
            PaymentMethod::Transfer => &self.transfer,
        }
    }
}

/// Substitute `{key}` placeholders
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |text, (key, value)| {
        text.replace(&format!("{{{}}}", key), value)
    })
}

/// Numbered option list ("1) Ana; 2) Bruno"), names verbatim
pub fn format_options(options: &[String]) -> String {
    options
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}) {}", i + 1, name))
        .collect::<Vec<_>>()
        .join("; ")
}

impl PromptTemplates {
    pub fn question(&self, slot: SlotName) -> &str {
        self.questions.for_slot(slot)
    }

    /// Questions for several missing slots, in order, as one message
    pub fn questions_for(&self, slots: &[SlotName]) -> String {
        slots
            .iter()
            .map(|s| self.question(*s))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn ambiguous(&self, mention: &str, options: &[String]) -> String {
        render(
            &self.responses.ambiguous,
            &[("mention", mention), ("options", &format_options(options))],
        )
    }

    pub fn not_found(&self, mention: &str, options: &[String]) -> String {
        render(
            &self.responses.not_found,
            &[("mention", mention), ("options", &format_options(options))],
        )
    }

    pub fn choose(&self, slot: SlotName, options: &[String]) -> String {
        render(
            &self.responses.choose,
            &[("question", self.question(slot)), ("options", &format_options(options))],
        )
    }

    pub fn invalid_description(&self, description: &str) -> String {
        render(&self.responses.invalid_description, &[("description", description)])
    }

    /// Static confirmation used when no completion service answers
    pub fn recorded(
        &self,
        description: &str,
        amount: &str,
        category: &str,
        payment: PaymentMethod,
    ) -> String {
        render(
            &self.responses.recorded,
            &[
                ("description", description),
                ("amount", amount),
                ("category", category),
                ("payment", self.payment_labels.label(payment)),
            ],
        )
    }

    /// Completion request for a one-line confirmation
    pub fn confirmation_request(
        &self,
        description: &str,
        amount: &str,
        category: &str,
        payment: PaymentMethod,
    ) -> CompletionRequest {
        let prompt = format!(
            "Confirme ao usuário que a despesa \"{}\" de {} foi registrada na categoria {}, paga via {}.",
            description,
            amount,
            category,
            self.payment_labels.label(payment)
        );
        CompletionRequest::new(prompt).with_system(self.system_prompt.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_slot_has_a_question() {
        let prompts = PromptTemplates::default();
        for slot in [
            SlotName::Amount,
            SlotName::Description,
            SlotName::PaymentMethod,
            SlotName::Card,
            SlotName::Installments,
            SlotName::Responsible,
            SlotName::Category,
        ] {
            assert!(!prompts.question(slot).is_empty());
        }
    }

    #[test]
    fn test_ambiguous_lists_names_verbatim() {
        let prompts = PromptTemplates::default();
        let text = prompts.ambiguous(
            "Felipe",
            &["Felipe Silva".to_string(), "Felipe Souza".to_string()],
        );
        assert!(text.contains("\"Felipe\""));
        assert!(text.contains("1) Felipe Silva; 2) Felipe Souza"));
    }

    #[test]
    fn test_recorded_fallback() {
        let prompts = PromptTemplates::default();
        let text = prompts.recorded("barbeiro", "R$ 80,00", "Beleza", PaymentMethod::Pix);
        assert_eq!(text, "✅ Despesa registrada: barbeiro (R$ 80,00) em Beleza, via pix.");
    }

    #[test]
    fn test_confirmation_request_carries_persona() {
        let prompts = PromptTemplates::default();
        let request =
            prompts.confirmation_request("mercado", "R$ 150,00", "Supermercado", PaymentMethod::Debit);
        assert!(request.prompt.contains("mercado"));
        assert!(request.prompt.contains("débito"));
        assert!(request.system.as_deref().unwrap_or("").contains("português"));
    }

    #[test]
    fn test_questions_for_joins_in_order() {
        let prompts = PromptTemplates::default();
        let text = prompts.questions_for(&[SlotName::Amount, SlotName::PaymentMethod]);
        assert!(text.starts_with("Qual foi o valor?"));
        assert!(text.contains("Como você pagou?"));
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render("{a} e {b}", &[("a", "x")]), "x e {b}");
    }
}
