//! Centralized constants for the expense agent
//!
//! Single source of truth for process-wide defaults. Settings structs use
//! these as their `Default` values; runtime overrides come from the settings
//! file or environment.

/// Conversation lifecycle
pub mod conversation {
    /// Inactivity after which a conversation is dropped (minutes)
    pub const TTL_MINUTES: i64 = 30;

    /// Turns kept in the conversation window
    pub const HISTORY_WINDOW: usize = 10;

    /// Minimum folded length for a message to start a new transaction
    pub const MIN_NEW_TRANSACTION_CHARS: usize = 8;
}

/// Extraction limits
pub mod extraction {
    /// Leading numbers at or above this value are read as money, below as quantity
    pub const QUANTITY_AMOUNT_THRESHOLD: f64 = 20.0;

    /// Maximum tokens kept in a description candidate
    pub const DESCRIPTION_MAX_TOKENS: usize = 3;

    /// Largest installment count accepted
    pub const MAX_INSTALLMENTS: u32 = 48;

    /// Largest amount accepted from free text (BRL)
    pub const MAX_AMOUNT: f64 = 10_000_000.0;

    /// Maximum tokens in a reset command ("cancela tudo")
    pub const RESET_MAX_TOKENS: usize = 3;
}

/// Service endpoints (defaults for local development)
pub mod endpoints {
    /// Ollama-compatible completion endpoint
    pub const OLLAMA_DEFAULT: &str = "http://localhost:11434";

    /// Default completion model
    pub const DEFAULT_MODEL: &str = "llama3.2";
}

/// Timeouts (in milliseconds)
pub mod timeouts {
    /// Completion request timeout; confirmation falls back to static copy after this
    pub const COMPLETION_MS: u64 = 4_000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_holds_a_dialogue() {
        assert!(conversation::HISTORY_WINDOW >= 2);
        assert!(conversation::TTL_MINUTES > 0);
    }

    #[test]
    fn test_extraction_limits() {
        assert!(extraction::MAX_INSTALLMENTS >= 12);
        assert!(extraction::QUANTITY_AMOUNT_THRESHOLD > 1.0);
    }
}
