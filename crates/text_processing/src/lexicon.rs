//! Compiled lexicon
//!
//! Folds every configured word once so lookups during extraction are plain
//! set membership on folded tokens.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use expense_agent_config::LexiconConfig;
use expense_agent_core::PaymentMethod;

use crate::normalize::{find_phrase, fold, tokenize, Token};

/// Lexicon compilation errors
#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("invalid nonsense pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A payment phrase found in a message
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentMention {
    pub method: PaymentMethod,
    /// Token positions covered by the phrase
    pub span: std::ops::Range<usize>,
}

/// Folded, ready-to-match lexicon
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub locale: String,
    stop_words: HashSet<String>,
    singular_verbs: HashSet<String>,
    plural_verbs: HashSet<String>,
    payment_phrases: Vec<(PaymentMethod, Vec<String>)>,
    instrument_words: HashSet<String>,
    currency_words: HashSet<String>,
    quantity_units: HashSet<String>,
    confirmation_words: HashSet<String>,
    reset_words: HashSet<String>,
    allow_list: HashSet<String>,
    nonsense: Vec<Regex>,
    self_hints: HashSet<String>,
    shared_hints: HashSet<String>,
    responsible_markers: HashSet<String>,
    owner_prepositions: HashSet<String>,
    category_markers: HashSet<String>,
    card_markers: HashSet<String>,
    installment_words: HashSet<String>,
    split_words: HashSet<String>,
    upfront_phrases: Vec<Vec<String>>,
    date_markers: HashSet<String>,
    thousand_words: HashSet<String>,
    number_words: HashMap<String, u32>,
}

fn word_set(words: &[String]) -> HashSet<String> {
    words.iter().map(|w| fold(w.trim())).filter(|w| !w.is_empty()).collect()
}

fn phrase(text: &str) -> Vec<String> {
    tokenize(text).into_iter().map(|t| t.folded).collect()
}

impl Lexicon {
    pub fn compile(config: &LexiconConfig) -> Result<Self, LexiconError> {
        let nonsense = config
            .nonsense_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| LexiconError::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut payment_phrases: Vec<(PaymentMethod, Vec<String>)> = config
            .payment_keywords
            .iter()
            .flat_map(|k| k.phrases.iter().map(move |p| (k.method, phrase(p))))
            .filter(|(_, p)| !p.is_empty())
            .collect();
        // longer phrases first so "cartao de credito" beats "credito" at a tie
        payment_phrases.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        Ok(Self {
            locale: config.locale.clone(),
            stop_words: word_set(&config.stop_words),
            singular_verbs: word_set(&config.singular_verbs),
            plural_verbs: word_set(&config.plural_verbs),
            payment_phrases,
            instrument_words: word_set(&config.instrument_words),
            currency_words: word_set(&config.currency_words),
            quantity_units: word_set(&config.quantity_units),
            confirmation_words: word_set(&config.confirmation_words),
            reset_words: word_set(&config.reset_words),
            allow_list: word_set(&config.short_description_allow_list),
            nonsense,
            self_hints: word_set(&config.self_hints),
            shared_hints: word_set(&config.shared_hints),
            responsible_markers: word_set(&config.responsible_markers),
            owner_prepositions: word_set(&config.owner_prepositions),
            category_markers: word_set(&config.category_markers),
            card_markers: word_set(&config.card_markers),
            installment_words: word_set(&config.installment_words),
            split_words: word_set(&config.split_words),
            upfront_phrases: config
                .upfront_phrases
                .iter()
                .map(|p| phrase(p))
                .filter(|p| !p.is_empty())
                .collect(),
            date_markers: word_set(&config.date_markers),
            thousand_words: word_set(&config.thousand_words),
            number_words: config
                .number_words
                .iter()
                .map(|(w, n)| (fold(w), *n))
                .collect(),
        })
    }

    pub fn is_stop_word(&self, folded: &str) -> bool {
        self.stop_words.contains(folded)
    }

    pub fn is_singular_verb(&self, folded: &str) -> bool {
        self.singular_verbs.contains(folded)
    }

    pub fn is_plural_verb(&self, folded: &str) -> bool {
        self.plural_verbs.contains(folded)
    }

    pub fn is_action_verb(&self, folded: &str) -> bool {
        self.is_singular_verb(folded) || self.is_plural_verb(folded)
    }

    pub fn is_instrument_word(&self, folded: &str) -> bool {
        self.instrument_words.contains(folded)
    }

    pub fn is_currency_word(&self, folded: &str) -> bool {
        self.currency_words.contains(folded)
    }

    pub fn is_quantity_unit(&self, folded: &str) -> bool {
        self.quantity_units.contains(folded)
    }

    pub fn is_confirmation(&self, folded: &str) -> bool {
        self.confirmation_words.contains(folded)
    }

    pub fn is_reset_word(&self, folded: &str) -> bool {
        self.reset_words.contains(folded)
    }

    pub fn is_allow_listed(&self, folded: &str) -> bool {
        self.allow_list.contains(folded)
    }

    pub fn is_self_hint(&self, folded: &str) -> bool {
        self.self_hints.contains(folded)
    }

    pub fn is_shared_hint(&self, folded: &str) -> bool {
        self.shared_hints.contains(folded)
    }

    pub fn is_responsible_marker(&self, folded: &str) -> bool {
        self.responsible_markers.contains(folded)
    }

    pub fn is_owner_preposition(&self, folded: &str) -> bool {
        self.owner_prepositions.contains(folded)
    }

    pub fn is_category_marker(&self, folded: &str) -> bool {
        self.category_markers.contains(folded)
    }

    pub fn is_card_marker(&self, folded: &str) -> bool {
        self.card_markers.contains(folded)
    }

    pub fn is_installment_word(&self, folded: &str) -> bool {
        self.installment_words.contains(folded)
    }

    pub fn is_split_word(&self, folded: &str) -> bool {
        self.split_words.contains(folded)
    }

    pub fn is_date_marker(&self, folded: &str) -> bool {
        self.date_markers.contains(folded)
    }

    pub fn is_thousand_word(&self, folded: &str) -> bool {
        self.thousand_words.contains(folded)
    }

    pub fn number_word(&self, folded: &str) -> Option<u32> {
        self.number_words.get(folded).copied()
    }

    /// Whether a folded description looks like transcription noise
    pub fn is_nonsense(&self, folded: &str) -> bool {
        self.nonsense.iter().any(|re| re.is_match(folded))
    }

    /// Earliest payment phrase in the tokens; longer phrase wins a tie
    pub fn find_payment(&self, tokens: &[Token]) -> Option<PaymentMention> {
        self.payment_phrases
            .iter()
            .filter_map(|(method, words)| {
                find_phrase(tokens, words).map(|start| PaymentMention {
                    method: *method,
                    span: start..start + words.len(),
                })
            })
            .min_by_key(|m| m.span.start)
    }

    /// Position and length of an upfront-payment phrase ("à vista")
    pub fn find_upfront(&self, tokens: &[Token]) -> Option<std::ops::Range<usize>> {
        self.upfront_phrases
            .iter()
            .filter_map(|words| find_phrase(tokens, words).map(|s| s..s + words.len()))
            .min_by_key(|r| r.start)
    }

    /// Whether the token is a word naming a payment method or instrument
    pub fn is_payment_word(&self, folded: &str) -> bool {
        self.is_instrument_word(folded)
            || self
                .payment_phrases
                .iter()
                .any(|(_, words)| words.len() == 1 && words[0] == folded)
    }
}
