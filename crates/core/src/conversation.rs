//! Conversation State
//!
//! Per-user dialogue state carried between turns. The core never keeps this
//! in memory itself: the caller loads it, passes it in, and stores what comes
//! back.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::transaction::{SlotName, TransactionSlots};

/// Speaker of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One message in the conversation window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
    /// Slot this user message answered, when it was a reply to a question
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered: Option<SlotName>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            answered: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
            answered: None,
        }
    }
}

/// Dialogue phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialoguePhase {
    #[default]
    Idle,
    Collecting,
    Resolving,
    Ready,
    Blocked,
}

/// Coarse conversation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    Idle,
}

/// Open question awaiting the user's answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingQuestion {
    pub slot: SlotName,
    /// Choices offered when disambiguating, verbatim
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl PendingQuestion {
    pub fn ask(slot: SlotName) -> Self {
        Self {
            slot,
            options: Vec::new(),
        }
    }

    pub fn choose(slot: SlotName, options: Vec<String>) -> Self {
        Self { slot, options }
    }

    pub fn has_options(&self) -> bool {
        !self.options.is_empty()
    }
}

/// Per-conversation dialogue state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub conversation_id: String,
    pub turns: VecDeque<Turn>,
    pub slots: TransactionSlots,
    pub phase: DialoguePhase,
    #[serde(default)]
    pub pending: Option<PendingQuestion>,
    pub last_updated: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(conversation_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            turns: VecDeque::new(),
            slots: TransactionSlots::default(),
            phase: DialoguePhase::Idle,
            pending: None,
            last_updated: now,
        }
    }

    pub fn status(&self) -> ConversationStatus {
        match self.phase {
            DialoguePhase::Idle => ConversationStatus::Idle,
            _ => ConversationStatus::Active,
        }
    }

    /// Append a turn, dropping the oldest beyond `window`
    pub fn push_turn(&mut self, turn: Turn, window: usize) {
        self.turns.push_back(turn);
        while self.turns.len() > window.max(1) {
            self.turns.pop_front();
        }
    }

    /// User turns, oldest first
    pub fn user_turns(&self) -> impl DoubleEndedIterator<Item = &Turn> {
        self.turns.iter().filter(|t| t.role == TurnRole::User)
    }

    /// Discard everything collected so far
    pub fn reset(&mut self) {
        self.turns.clear();
        self.slots = TransactionSlots::default();
        self.pending = None;
        self.phase = DialoguePhase::Idle;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = now;
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_updated > ttl
    }
}
