//! Error types for turn processing

use thiserror::Error;

use crate::transaction::SlotName;

/// Failures while turning a message into a transaction.
///
/// Everything except `DownstreamPersistenceFailure` is recovered inside the
/// dialogue manager by asking the user a question.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TurnError {
    #[error("ambiguous {slot}: {}", .candidates.join(", "))]
    ExtractionAmbiguous {
        slot: SlotName,
        candidates: Vec<String>,
    },

    #[error("missing slots: {}", join_slots(.0))]
    ExtractionMissing(Vec<SlotName>),

    #[error("no {slot} matches '{mention}'")]
    EntityNotFound { slot: SlotName, mention: String },

    #[error("invalid description '{0}'")]
    InvalidDescription(String),

    #[error("could not save transaction: {0}")]
    DownstreamPersistenceFailure(String),
}

impl TurnError {
    /// Whether the dialogue can recover by asking the user
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TurnError::DownstreamPersistenceFailure(_))
    }

    /// Slot the error is about, if any
    pub fn slot(&self) -> Option<SlotName> {
        match self {
            TurnError::ExtractionAmbiguous { slot, .. } => Some(*slot),
            TurnError::ExtractionMissing(slots) => slots.first().copied(),
            TurnError::EntityNotFound { slot, .. } => Some(*slot),
            TurnError::InvalidDescription(_) => Some(SlotName::Description),
            TurnError::DownstreamPersistenceFailure(_) => None,
        }
    }
}

fn join_slots(slots: &[SlotName]) -> String {
    slots
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, TurnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TurnError::ExtractionMissing(vec![SlotName::Amount, SlotName::PaymentMethod]);
        assert_eq!(err.to_string(), "missing slots: amount, payment_method");

        let err = TurnError::ExtractionAmbiguous {
            slot: SlotName::Responsible,
            candidates: vec!["Felipe Silva".into(), "Felipe Souza".into()],
        };
        assert_eq!(err.to_string(), "ambiguous responsible: Felipe Silva, Felipe Souza");
    }

    #[test]
    fn test_only_persistence_is_unrecoverable() {
        assert!(TurnError::InvalidDescription("ah".into()).is_recoverable());
        assert!(!TurnError::DownstreamPersistenceFailure("timeout".into()).is_recoverable());
        assert_eq!(
            TurnError::InvalidDescription("ah".into()).slot(),
            Some(SlotName::Description)
        );
    }
}
