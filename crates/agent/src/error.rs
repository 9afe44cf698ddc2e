//! Agent errors

use thiserror::Error;

use expense_agent_persistence::PersistenceError;
use expense_agent_text_processing::LexiconError;

/// Failures surfaced to the caller of `ExpenseAgent`.
///
/// Dialogue problems never show up here: they become questions to the user.
/// A failed transaction save is answered with an apology, not an error.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("conversation store error: {0}")]
    Store(#[from] PersistenceError),

    #[error("lexicon error: {0}")]
    Lexicon(#[from] LexiconError),
}

pub type Result<T> = std::result::Result<T, AgentError>;
