//! Transaction assembly
//!
//! Turns complete slots plus resolved directory records into the draft
//! handed to persistence.

use expense_agent_core::{
    plan_installments, round_currency, DirectoryMatch, PaymentMethod, ResponsibleParty,
    RoundingPolicy, SlotName, TransactionDraft, TransactionSlots, TurnError,
};

/// Directory records resolved for a transaction
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntities {
    pub responsible: ResponsibleParty,
    pub card: Option<DirectoryMatch>,
    pub category: DirectoryMatch,
}

/// Builds drafts and their installment plans
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionAssembler {
    rounding: RoundingPolicy,
}

impl TransactionAssembler {
    pub fn new(rounding: RoundingPolicy) -> Self {
        Self { rounding }
    }

    pub fn assemble(
        &self,
        slots: &TransactionSlots,
        resolved: ResolvedEntities,
    ) -> Result<TransactionDraft, TurnError> {
        let mut missing = Vec::new();
        if !slots.has_amount() {
            missing.push(SlotName::Amount);
        }
        if !slots.has_description() {
            missing.push(SlotName::Description);
        }
        if slots.payment_method.is_none() {
            missing.push(SlotName::PaymentMethod);
        }
        let (Some(amount), Some(description), Some(payment_method)) =
            (slots.amount, slots.description.as_deref(), slots.payment_method)
        else {
            return Err(TurnError::ExtractionMissing(missing));
        };
        if !missing.is_empty() {
            return Err(TurnError::ExtractionMissing(missing));
        }

        let amount = round_currency(amount);
        let installment_plan = match payment_method {
            PaymentMethod::Credit => {
                let count = slots.installments.unwrap_or(1).max(1);
                Some(plan_installments(amount, count, self.rounding))
            }
            _ => None,
        };
        let card_id = if payment_method.uses_card() {
            resolved.card.map(|c| c.id)
        } else {
            None
        };

        Ok(TransactionDraft {
            amount,
            description: description.trim().to_string(),
            payment_method,
            card_id,
            installment_plan,
            responsible: resolved.responsible,
            category_id: resolved.category.id,
            category_name: resolved.category.name,
        })
    }
}
