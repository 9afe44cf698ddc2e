//! Core types and traits for the expense agent
//!
//! Everything the dialogue pipeline passes between stages lives here:
//! slots, drafts, directory records, conversation state, clarification
//! requests, the installment planner and the error taxonomy.

pub mod clarification;
pub mod conversation;
pub mod directory;
pub mod error;
pub mod financial;
pub mod traits;
pub mod transaction;

pub use clarification::ClarificationRequest;
pub use conversation::{
    ConversationState, ConversationStatus, DialoguePhase, PendingQuestion, Turn, TurnRole,
};
pub use directory::{
    Card, Category, CategoryScope, CostCenter, DirectoryEntry, DirectoryMatch, OrgDirectory,
    ResolutionResult,
};
pub use error::{Result, TurnError};
pub use financial::{format_brl, plan_installments, round_currency, InstallmentPlan, RoundingPolicy};
pub use traits::{CompletionError, CompletionRequest, CompletionService};
pub use transaction::{
    PaymentMethod, ResponsibleHint, ResponsibleParty, SlotName, TransactionDraft, TransactionSlots,
};
