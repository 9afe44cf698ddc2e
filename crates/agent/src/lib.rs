//! Expense dialogue agent
//!
//! Turns freeform Portuguese expense messages into transaction drafts over a
//! multi-turn dialogue.
//!
//! - `dst`: dialogue state manager, slot extraction, description checks
//! - `resolver`: matching mentions against directory lists
//! - `classifier`: category inference with fallback chains
//! - `assembler`: draft and installment plan construction
//! - `confirmation`: reply text once a transaction is saved
//! - `agent`: async turn handler over the store and sink

pub mod agent;
pub mod assembler;
pub mod classifier;
pub mod confirmation;
pub mod dst;
pub mod error;
pub mod resolver;

pub use agent::{AgentReply, ExpenseAgent, ReplyKind};
pub use assembler::{ResolvedEntities, TransactionAssembler};
pub use classifier::CategoryClassifier;
pub use confirmation::ConfirmationWriter;
pub use dst::{
    DescriptionIssue, DescriptionValidator, DialogueStateManager, ExtractedSlots,
    ExtractionContext, SlotExtractor, TurnOutcome, TurnResult,
};
pub use error::{AgentError, Result};
pub use resolver::EntityResolver;
