//! Per-turn extraction result and description validation
//!
//! `ExtractedSlots` is what one message contributed. Merging it into the
//! conversation's `TransactionSlots` lets newer values replace older ones
//! without ever clearing a slot the message said nothing about.

use serde::{Deserialize, Serialize};

use expense_agent_core::{PaymentMethod, ResponsibleHint, SlotName, TransactionSlots};
use expense_agent_text_processing::{fold, tokenize, Lexicon};

/// Slot values read from a single message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSlots {
    pub amount: Option<f64>,
    pub payment_method: Option<PaymentMethod>,
    /// Card mention, resolved later against the active cards
    pub card_name: Option<String>,
    pub installments: Option<u32>,
    pub split_requested: bool,
    pub responsible: Option<ResponsibleHint>,
    /// Explicit category mention ("categoria lazer")
    pub category: Option<String>,
    /// Description candidate left after every other slot took its words
    pub description: Option<String>,
    /// Option picked from a disambiguation list
    pub selected_option: Option<String>,
    /// Slot of the open question this message answered
    pub answered: Option<SlotName>,
    pub has_action_verb: bool,
    pub is_confirmation: bool,
}

impl ExtractedSlots {
    /// Whether the message carried anything besides the description
    pub fn has_values(&self) -> bool {
        self.amount.is_some()
            || self.payment_method.is_some()
            || self.card_name.is_some()
            || self.installments.is_some()
            || self.split_requested
            || self.responsible.is_some()
            || self.category.is_some()
            || self.selected_option.is_some()
    }

    /// Merge into the running slots; present values replace older ones
    pub fn merge_into(&self, slots: &mut TransactionSlots) {
        if let Some(amount) = self.amount {
            slots.amount = Some(amount);
        }
        if let Some(method) = self.payment_method {
            if slots.payment_method != Some(method) {
                // a different method invalidates the old installment answer
                slots.installments = None;
            }
            slots.payment_method = Some(method);
        }
        if let Some(card) = &self.card_name {
            slots.card_name = Some(card.clone());
        }
        if let Some(count) = self.installments {
            slots.installments = Some(count);
        }
        if self.split_requested {
            slots.split_requested = true;
            if self.installments.is_none() {
                slots.installments = None;
            }
        }
        if let Some(responsible) = &self.responsible {
            slots.responsible = Some(responsible.clone());
        }
        if let Some(category) = &self.category {
            slots.category = Some(category.clone());
        }
    }

    /// Apply a picked option to the slot it was offered for
    pub fn apply_selection(&self, slot: SlotName, slots: &mut TransactionSlots) {
        let Some(choice) = &self.selected_option else {
            return;
        };
        match slot {
            SlotName::Responsible => slots.responsible = Some(ResponsibleHint::Named(choice.clone())),
            SlotName::Card => slots.card_name = Some(choice.clone()),
            SlotName::Category => slots.category = Some(choice.clone()),
            SlotName::Description => slots.description = Some(choice.clone()),
            SlotName::PaymentMethod => {
                if let Some(method) = PaymentMethod::parse(choice) {
                    slots.payment_method = Some(method);
                }
            }
            SlotName::Amount | SlotName::Installments => {}
        }
    }
}

/// Why a description was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionIssue {
    DigitsOnly,
    TooShort,
    Nonsense,
    PaymentOrVerb,
}

/// Rejects fillers and noise as descriptions ("ah", "kkk", "123", "cartão")
pub struct DescriptionValidator<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> DescriptionValidator<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn check(&self, description: &str) -> Result<(), DescriptionIssue> {
        let tokens = tokenize(description);
        let folded = fold(description.trim());

        if !folded.chars().any(|c| c.is_alphabetic()) {
            return Err(DescriptionIssue::DigitsOnly);
        }

        let letters = folded.chars().filter(|c| c.is_alphabetic()).count();
        if letters <= 2 && !tokens.iter().any(|t| self.lexicon.is_allow_listed(&t.folded)) {
            return Err(DescriptionIssue::TooShort);
        }

        if self.lexicon.is_nonsense(&folded)
            || (!tokens.is_empty() && tokens.iter().all(|t| self.lexicon.is_nonsense(&t.folded)))
        {
            return Err(DescriptionIssue::Nonsense);
        }

        if tokens.iter().all(|t| {
            self.lexicon.is_payment_word(&t.folded) || self.lexicon.is_action_verb(&t.folded)
        }) {
            return Err(DescriptionIssue::PaymentOrVerb);
        }

        Ok(())
    }

    pub fn is_valid(&self, description: &str) -> bool {
        self.check(description).is_ok()
    }
}
