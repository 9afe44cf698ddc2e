//! Transaction sink
//!
//! Receives finalized drafts. The sink owns identifiers and derives the
//! installment rows from the draft's plan.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use expense_agent_core::TransactionDraft;

use crate::error::PersistenceError;

/// A stored transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTransaction {
    pub id: Uuid,
    pub draft: TransactionDraft,
    /// One amount per installment row, in order
    pub installment_amounts: Vec<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl PersistedTransaction {
    pub fn from_draft(draft: &TransactionDraft, recorded_at: DateTime<Utc>) -> Self {
        let installment_amounts = match &draft.installment_plan {
            Some(plan) => plan.installment_amounts(),
            None => vec![draft.amount],
        };
        Self {
            id: Uuid::new_v4(),
            draft: draft.clone(),
            installment_amounts,
            recorded_at,
        }
    }
}

/// Destination for finalized transactions
#[async_trait]
pub trait TransactionSink: Send + Sync {
    async fn persist(&self, draft: &TransactionDraft)
        -> Result<PersistedTransaction, PersistenceError>;
}

/// In-memory sink
#[derive(Default)]
pub struct InMemoryTransactionSink {
    records: RwLock<Vec<PersistedTransaction>>,
}

impl InMemoryTransactionSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<PersistedTransaction> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl TransactionSink for InMemoryTransactionSink {
    async fn persist(
        &self,
        draft: &TransactionDraft,
    ) -> Result<PersistedTransaction, PersistenceError> {
        if draft.amount.is_nan() || draft.amount <= 0.0 || draft.description.trim().is_empty() {
            return Err(PersistenceError::Rejected(format!(
                "incomplete draft '{}'",
                draft.description
            )));
        }

        let record = PersistedTransaction::from_draft(draft, Utc::now());
        tracing::info!(
            id = %record.id,
            amount = draft.amount,
            category = %draft.category_name,
            installments = record.installment_amounts.len(),
            "Transaction recorded"
        );
        self.records.write().push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expense_agent_core::{plan_installments, PaymentMethod, ResponsibleParty, RoundingPolicy};

    fn draft(amount: f64, installments: Option<u32>) -> TransactionDraft {
        TransactionDraft {
            amount,
            description: "geladeira".into(),
            payment_method: PaymentMethod::Credit,
            card_id: Some("k1".into()),
            installment_plan: installments
                .map(|n| plan_installments(amount, n, RoundingPolicy::AsObserved)),
            responsible: ResponsibleParty::Shared,
            category_id: "c1".into(),
            category_name: "Casa".into(),
        }
    }

    #[tokio::test]
    async fn test_persist_derives_installment_rows() {
        let sink = InMemoryTransactionSink::new();
        let record = sink.persist(&draft(100.0, Some(3))).await.unwrap();

        assert_eq!(record.installment_amounts, vec![33.33, 33.33, 33.33]);
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_single_payment_is_one_row() {
        let sink = InMemoryTransactionSink::new();
        let record = sink.persist(&draft(80.0, None)).await.unwrap();
        assert_eq!(record.installment_amounts, vec![80.0]);
    }

    #[tokio::test]
    async fn test_rejects_incomplete_draft() {
        let sink = InMemoryTransactionSink::new();
        let err = sink.persist(&draft(0.0, None)).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Rejected(_)));
        assert!(sink.is_empty());
    }
}
