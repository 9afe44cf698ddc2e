//! Transaction Slots and Drafts
//!
//! The partial transaction collected across turns (`TransactionSlots`) and
//! the fully resolved record handed to persistence (`TransactionDraft`).

use serde::{Deserialize, Serialize};

use crate::financial::InstallmentPlan;

/// How the transaction was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    Debit,
    Credit,
    Cash,
    Boleto,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Pix => "pix",
            PaymentMethod::Debit => "debit",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Boleto => "boleto",
            PaymentMethod::Transfer => "transfer",
        }
    }

    /// Parse from the canonical name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pix" => Some(PaymentMethod::Pix),
            "debit" => Some(PaymentMethod::Debit),
            "credit" => Some(PaymentMethod::Credit),
            "cash" => Some(PaymentMethod::Cash),
            "boleto" => Some(PaymentMethod::Boleto),
            "transfer" => Some(PaymentMethod::Transfer),
            _ => None,
        }
    }

    /// Whether a card can be attached to this method
    pub fn uses_card(&self) -> bool {
        matches!(self, PaymentMethod::Credit | PaymentMethod::Debit)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who the expense belongs to, as understood from the text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "mention", rename_all = "snake_case")]
pub enum ResponsibleHint {
    /// The person writing ("gastei")
    #[serde(rename = "self")]
    SelfUser,
    /// Shared household expense ("gastamos", "despesa da família")
    Shared,
    /// A named person to be resolved against the cost centers
    Named(String),
}

/// Named slots of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotName {
    Amount,
    Description,
    PaymentMethod,
    Card,
    Installments,
    Responsible,
    Category,
}

impl SlotName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotName::Amount => "amount",
            SlotName::Description => "description",
            SlotName::PaymentMethod => "payment_method",
            SlotName::Card => "card",
            SlotName::Installments => "installments",
            SlotName::Responsible => "responsible",
            SlotName::Category => "category",
        }
    }

    /// Slots that must be filled before resolution starts
    pub const CORE: [SlotName; 4] = [
        SlotName::Amount,
        SlotName::Description,
        SlotName::PaymentMethod,
        SlotName::Responsible,
    ];
}

impl std::fmt::Display for SlotName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Partial transaction collected across turns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionSlots {
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub card_name: Option<String>,
    pub installments: Option<u32>,
    pub responsible: Option<ResponsibleHint>,
    pub category: Option<String>,
    /// User asked to split the payment but gave no count yet
    #[serde(default)]
    pub split_requested: bool,
}

impl TransactionSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_amount(&self) -> bool {
        self.amount.map(|a| a > 0.0 && a.is_finite()).unwrap_or(false)
    }

    pub fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .map(|d| !d.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.description.is_none()
            && self.payment_method.is_none()
            && self.card_name.is_none()
            && self.installments.is_none()
            && self.responsible.is_none()
            && self.category.is_none()
    }

    /// Enforce the credit invariant.
    ///
    /// Installments only exist for credit; credit without a stated count is a
    /// single installment unless the user asked to split it. Cards are kept
    /// only for card-based methods.
    pub fn apply_payment_invariants(&mut self) {
        match self.payment_method {
            Some(PaymentMethod::Credit) => {
                if let Some(n) = self.installments {
                    if n == 0 {
                        self.installments = None;
                    } else {
                        self.split_requested = false;
                    }
                }
                if self.installments.is_none() && !self.split_requested {
                    self.installments = Some(1);
                }
            }
            Some(method) => {
                self.installments = None;
                self.split_requested = false;
                if !method.uses_card() {
                    self.card_name = None;
                }
            }
            None => {}
        }
    }

    /// Clear a single slot
    pub fn clear(&mut self, slot: SlotName) {
        match slot {
            SlotName::Amount => self.amount = None,
            SlotName::Description => self.description = None,
            SlotName::PaymentMethod => self.payment_method = None,
            SlotName::Card => self.card_name = None,
            SlotName::Installments => self.installments = None,
            SlotName::Responsible => self.responsible = None,
            SlotName::Category => self.category = None,
        }
    }
}

/// Resolved owner of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponsibleParty {
    CostCenter { id: String, name: String },
    Shared,
}

/// Fully resolved transaction, ready for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub amount: f64,
    pub description: String,
    pub payment_method: PaymentMethod,
    pub card_id: Option<String>,
    pub installment_plan: Option<InstallmentPlan>,
    pub responsible: ResponsibleParty,
    pub category_id: String,
    pub category_name: String,
}

impl TransactionDraft {
    pub fn cost_center_id(&self) -> Option<&str> {
        match &self.responsible {
            ResponsibleParty::CostCenter { id, .. } => Some(id),
            ResponsibleParty::Shared => None,
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self.responsible, ResponsibleParty::Shared)
    }

    /// Number of installment rows the persistence adapter should derive
    pub fn installment_count(&self) -> u32 {
        self.installment_plan.as_ref().map(|p| p.count).unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_defaults_to_single_installment() {
        let mut slots = TransactionSlots {
            payment_method: Some(PaymentMethod::Credit),
            ..Default::default()
        };
        slots.apply_payment_invariants();
        assert_eq!(slots.installments, Some(1));
    }

    #[test]
    fn test_split_request_leaves_installments_open() {
        let mut slots = TransactionSlots {
            payment_method: Some(PaymentMethod::Credit),
            split_requested: true,
            ..Default::default()
        };
        slots.apply_payment_invariants();
        assert_eq!(slots.installments, None);

        slots.installments = Some(4);
        slots.apply_payment_invariants();
        assert_eq!(slots.installments, Some(4));
        assert!(!slots.split_requested);
    }

    #[test]
    fn test_non_credit_drops_installments_and_card() {
        let mut slots = TransactionSlots {
            payment_method: Some(PaymentMethod::Pix),
            installments: Some(3),
            card_name: Some("Nubank".to_string()),
            ..Default::default()
        };
        slots.apply_payment_invariants();
        assert_eq!(slots.installments, None);
        assert_eq!(slots.card_name, None);

        let mut debit = TransactionSlots {
            payment_method: Some(PaymentMethod::Debit),
            installments: Some(3),
            card_name: Some("Nubank".to_string()),
            ..Default::default()
        };
        debit.apply_payment_invariants();
        assert_eq!(debit.installments, None);
        assert_eq!(debit.card_name.as_deref(), Some("Nubank"));
    }

    #[test]
    fn test_amount_must_be_positive() {
        let mut slots = TransactionSlots::new();
        assert!(!slots.has_amount());
        slots.amount = Some(0.0);
        assert!(!slots.has_amount());
        slots.amount = Some(12.5);
        assert!(slots.has_amount());
    }

    #[test]
    fn test_responsible_hint_serialization() {
        let json = serde_json::to_string(&ResponsibleHint::SelfUser).unwrap();
        assert_eq!(json, r#"{"kind":"self"}"#);

        let named: ResponsibleHint =
            serde_json::from_str(r#"{"kind":"named","mention":"Felipe"}"#).unwrap();
        assert_eq!(named, ResponsibleHint::Named("Felipe".to_string()));
    }
}
