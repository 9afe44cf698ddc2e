//! Clarification requests emitted when a draft cannot be assembled yet.

use serde::{Deserialize, Serialize};

use crate::transaction::SlotName;

/// Question to send back to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarificationRequest {
    /// Slot the question is about; the next answer is read against it
    pub slot: SlotName,
    /// All slots still missing, in asking order
    pub missing_slots: Vec<SlotName>,
    pub prompt_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disambiguation_options: Option<Vec<String>>,
}

impl ClarificationRequest {
    pub fn missing(missing_slots: Vec<SlotName>, prompt_text: impl Into<String>) -> Self {
        let slot = missing_slots.first().copied().unwrap_or(SlotName::Description);
        Self {
            slot,
            missing_slots,
            prompt_text: prompt_text.into(),
            disambiguation_options: None,
        }
    }

    pub fn choose(slot: SlotName, options: Vec<String>, prompt_text: impl Into<String>) -> Self {
        Self {
            slot,
            missing_slots: vec![slot],
            prompt_text: prompt_text.into(),
            disambiguation_options: Some(options),
        }
    }

    pub fn options(&self) -> &[String] {
        self.disambiguation_options.as_deref().unwrap_or(&[])
    }
}
