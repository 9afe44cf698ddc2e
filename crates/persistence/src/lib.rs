//! Persistence layer for the expense agent
//!
//! Provides storage for:
//! - Conversation state between turns (TTL-bounded)
//! - Finalized transactions
//!
//! In-memory implementations back tests and the console; a relational
//! adapter implements the same traits in deployment.

pub mod conversations;
pub mod error;
pub mod transactions;

pub use conversations::{ConversationStateStore, InMemoryConversationStore};
pub use error::PersistenceError;
pub use transactions::{InMemoryTransactionSink, PersistedTransaction, TransactionSink};
