//! Text Normalization
//!
//! Folding (lowercase, diacritics stripped), word tokenization and the
//! core-description heuristic used to pull "what was bought" out of a message.
//!
//! # Example
//!
//! ```ignore
//! use expense_agent_text_processing::normalize::TextNormalizer;
//!
//! let normalizer = TextNormalizer::new(&LexiconConfig::default())?;
//! let text = normalizer.normalize("Gastei R$ 80 no Barbeiro");
//! assert_eq!(text.folded, "gastei r 80 no barbeiro");
//! ```

use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use expense_agent_config::constants::extraction::{
    DESCRIPTION_MAX_TOKENS, QUANTITY_AMOUNT_THRESHOLD,
};
use expense_agent_config::LexiconConfig;

use crate::entities::{installment_token_count, is_integer_token, is_monetary_token};
use crate::lexicon::{Lexicon, LexiconError};

/// Lowercase and strip diacritics ("Farmácia" → "farmacia")
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// A word of the message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lowercased, accents kept
    pub raw: String,
    /// Lowercased, accents stripped
    pub folded: String,
}

impl Token {
    pub fn new(word: &str) -> Self {
        let raw = word.to_lowercase();
        let folded = fold(&raw);
        Self { raw, folded }
    }
}

/// Split into words; punctuation becomes a boundary.
///
/// Numbers keep their separators ("1.234,56") and "3x" stays one token.
pub fn tokenize(text: &str) -> Vec<Token> {
    text.unicode_words().map(Token::new).collect()
}

/// Start of the first occurrence of a folded word sequence
pub fn find_phrase(tokens: &[Token], phrase: &[String]) -> Option<usize> {
    if phrase.is_empty() || phrase.len() > tokens.len() {
        return None;
    }
    tokens
        .windows(phrase.len())
        .position(|w| w.iter().zip(phrase).all(|(t, p)| t.folded == *p))
}

/// Message after normalization
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedText {
    pub original: String,
    /// Folded tokens joined by single spaces
    pub folded: String,
    pub tokens: Vec<Token>,
}

impl NormalizedText {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Length of the folded text, in characters
    pub fn folded_len(&self) -> usize {
        self.folded.chars().count()
    }
}

/// Lexicon-aware normalizer
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    lexicon: Lexicon,
}

impl TextNormalizer {
    pub fn new(config: &LexiconConfig) -> Result<Self, LexiconError> {
        Ok(Self {
            lexicon: Lexicon::compile(config)?,
        })
    }

    pub fn from_lexicon(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn normalize(&self, text: &str) -> NormalizedText {
        let tokens = tokenize(text);
        let folded = tokens
            .iter()
            .map(|t| t.folded.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        NormalizedText {
            original: text.to_string(),
            folded,
            tokens,
        }
    }

    /// Tokens that are not stop-words
    pub fn meaningful_tokens<'a>(&self, tokens: &'a [Token]) -> Vec<&'a Token> {
        tokens
            .iter()
            .filter(|t| !self.lexicon.is_stop_word(&t.folded))
            .collect()
    }

    /// Description candidate: up to three meaningful words, raw form.
    ///
    /// `excluded` holds token positions already consumed by other slots
    /// (amount, card, payment phrase, owner mention).
    pub fn core_description(&self, tokens: &[Token], excluded: &HashSet<usize>) -> Option<String> {
        let lexicon = &self.lexicon;
        let has_unit = tokens.iter().any(|t| lexicon.is_quantity_unit(&t.folded));

        let mut kept: Vec<&Token> = Vec::new();
        let mut after_date_marker = false;
        for (i, token) in tokens.iter().enumerate() {
            let word = token.folded.as_str();
            let follows_date = std::mem::take(&mut after_date_marker);
            if excluded.contains(&i) {
                continue;
            }
            if lexicon.is_date_marker(word) {
                after_date_marker = true;
                continue;
            }
            if follows_date && is_integer_token(word) {
                continue;
            }
            if is_monetary_token(word)
                || installment_token_count(word).is_some()
                || lexicon.is_payment_word(word)
                || lexicon.is_stop_word(word)
                || lexicon.is_action_verb(word)
                || lexicon.is_currency_word(word)
                || lexicon.is_thousand_word(word)
                || lexicon.is_split_word(word)
                || lexicon.is_installment_word(word)
            {
                continue;
            }
            kept.push(token);
        }

        if kept.len() == 2 && !has_unit {
            let leading = kept[0].folded.as_str();
            let is_amount_like = is_integer_token(leading)
                && leading
                    .parse::<f64>()
                    .map(|n| n >= QUANTITY_AMOUNT_THRESHOLD)
                    .unwrap_or(false);
            if is_amount_like {
                kept.remove(0);
            }
        }

        if kept.is_empty() {
            return None;
        }
        Some(
            kept.iter()
                .take(DESCRIPTION_MAX_TOKENS)
                .map(|t| t.raw.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new(&LexiconConfig::default()).unwrap()
    }

    fn describe(text: &str) -> Option<String> {
        let n = normalizer();
        let normalized = n.normalize(text);
        n.core_description(&normalized.tokens, &HashSet::new())
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold("Farmácia São João"), "farmacia sao joao");
        assert_eq!(fold("CRÉDITO"), "credito");
    }

    #[test]
    fn test_tokenize_keeps_number_formats() {
        let tokens = tokenize("R$ 1.234,56 em 3x!");
        let folded: Vec<_> = tokens.iter().map(|t| t.folded.as_str()).collect();
        assert_eq!(folded, vec!["r", "1.234,56", "em", "3x"]);
    }

    #[test]
    fn test_token_keeps_accents_in_raw() {
        let token = Token::new("Televisões");
        assert_eq!(token.raw, "televisões");
        assert_eq!(token.folded, "televisoes");
    }

    #[test]
    fn test_find_phrase() {
        let tokens = tokenize("paguei no cartão de crédito");
        let phrase: Vec<String> = vec!["cartao".into(), "de".into(), "credito".into()];
        assert_eq!(find_phrase(&tokens, &phrase), Some(2));
        assert_eq!(find_phrase(&tokens, &["boleto".to_string()]), None);
    }

    #[test]
    fn test_leading_amount_is_stripped() {
        assert_eq!(describe("150 mercado").as_deref(), Some("mercado"));
    }

    #[test]
    fn test_small_quantity_is_kept() {
        assert_eq!(describe("2 televisões").as_deref(), Some("2 televisões"));
    }

    #[test]
    fn test_unit_keeps_leading_number() {
        assert_eq!(describe("50 kg ração").as_deref(), Some("50 kg ração"));
    }

    #[test]
    fn test_description_drops_money_and_payment() {
        assert_eq!(
            describe("gastei 80,00 no barbeiro no pix").as_deref(),
            Some("barbeiro")
        );
        assert_eq!(describe("comprei tênis em 3x no crédito").as_deref(), Some("tênis"));
    }

    #[test]
    fn test_description_caps_at_three_words() {
        assert_eq!(
            describe("comprei ração areia brinquedo coleira").as_deref(),
            Some("ração areia brinquedo")
        );
    }

    #[test]
    fn test_date_number_is_dropped() {
        assert_eq!(describe("conta de luz dia 5").as_deref(), Some("conta luz"));
    }

    #[test]
    fn test_nothing_left() {
        assert_eq!(describe("gastei no pix"), None);
    }

    #[test]
    fn test_excluded_positions() {
        let n = normalizer();
        let normalized = n.normalize("compramos no crédito Latam");
        let excluded: HashSet<usize> = [3].into_iter().collect();
        assert_eq!(n.core_description(&normalized.tokens, &excluded), None);
    }

    #[test]
    fn test_meaningful_tokens() {
        let n = normalizer();
        let normalized = n.normalize("cancela tudo");
        let meaningful = n.meaningful_tokens(&normalized.tokens);
        assert_eq!(meaningful.len(), 1);
        assert_eq!(meaningful[0].folded, "cancela");
    }
}
