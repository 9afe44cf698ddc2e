//! Text processing for expense messages
//!
//! Normalization and lexical extraction over noisy, abbreviated Portuguese:
//! - `normalize`: folding, tokenization, core description
//! - `lexicon`: locale word lists compiled for matching
//! - `entities`: amounts and installment counts

pub mod entities;
pub mod lexicon;
pub mod normalize;

pub use entities::{
    bare_count, find_amount, find_installments, parse_brl_number, InstallmentMention,
    MoneyMention,
};
pub use lexicon::{Lexicon, LexiconError, PaymentMention};
pub use normalize::{find_phrase, fold, tokenize, NormalizedText, TextNormalizer, Token};
