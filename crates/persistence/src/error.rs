//! Persistence errors

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("record rejected: {0}")]
    Rejected(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl PersistenceError {
    /// Whether retrying the same operation later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, PersistenceError::Unavailable(_))
    }
}
