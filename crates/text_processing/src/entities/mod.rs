//! Money and installment extraction
//!
//! Reads amounts and installment counts from tokenized Portuguese text:
//! - Brazilian number formats (`1.234,56`, `47,90`, `1.500`, `2 mil`)
//! - currency markers (`R$`, `reais`, `conto`)
//! - quantities that are not money (`2 televisões`, `5 kg`, `dia 10`)
//! - installment counts (`3x`, `10 vezes`, `três parcelas`, `à vista`)
//!
//! # Example
//!
//! ```ignore
//! use expense_agent_text_processing::entities::find_amount;
//!
//! let text = normalizer.normalize("paguei R$ 1.234,56 na geladeira");
//! let money = find_amount(&text, normalizer.lexicon()).unwrap();
//! assert_eq!(money.value, 1234.56);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use expense_agent_config::constants::extraction::{
    MAX_AMOUNT, MAX_INSTALLMENTS, QUANTITY_AMOUNT_THRESHOLD,
};

use crate::lexicon::Lexicon;
use crate::normalize::{tokenize, NormalizedText, Token};

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

static MONETARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[.,]\d{1,2}$").unwrap());

// 1.500 / 12.345.678 / 1.234,56
static THOUSANDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3}(?:\.\d{3})+)(?:,(\d{1,2}))?$").unwrap());

static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)(?:[.,](\d{1,2}))?$").unwrap());

static INSTALLMENT_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2})x$").unwrap());

pub fn is_integer_token(folded: &str) -> bool {
    INTEGER.is_match(folded)
}

/// `47,90` / `47.90`
pub fn is_monetary_token(folded: &str) -> bool {
    MONETARY.is_match(folded)
}

/// Count from a `3x` token
pub fn installment_token_count(folded: &str) -> Option<u32> {
    INSTALLMENT_TOKEN
        .captures(folded)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse a Brazilian-formatted number
pub fn parse_brl_number(text: &str) -> Option<f64> {
    let text = text.trim();

    if let Some(caps) = THOUSANDS.captures(text) {
        let units = caps.get(1)?.as_str().replace('.', "");
        return match caps.get(2) {
            Some(cents) => format!("{}.{}", units, cents.as_str()).parse().ok(),
            None => units.parse().ok(),
        };
    }

    let caps = DECIMAL.captures(text)?;
    let units = caps.get(1)?.as_str();
    match caps.get(2) {
        Some(cents) => format!("{}.{}", units, cents.as_str()).parse().ok(),
        None => units.parse().ok(),
    }
}

/// An amount found in a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyMention {
    pub value: f64,
    /// Token positions the amount was read from (number, multiplier, markers)
    pub span: Range<usize>,
    /// A currency marker was attached
    pub has_currency: bool,
    /// The message was nothing but this amount
    pub bare: bool,
}

/// An installment count found in a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentMention {
    pub count: u32,
    pub span: Range<usize>,
}

fn within_limits(value: f64) -> bool {
    value > 0.0 && value <= MAX_AMOUNT
}

/// Amount written as a line on its own ("80", "R$ 47,90", "2 mil reais")
fn bare_line_amount(line: &str, lexicon: &Lexicon) -> Option<f64> {
    let words: Vec<Token> = tokenize(line)
        .into_iter()
        .filter(|t| !lexicon.is_currency_word(&t.folded))
        .collect();
    match words.as_slice() {
        [number] => parse_brl_number(&number.folded),
        [number, multiplier] if lexicon.is_thousand_word(&multiplier.folded) => {
            parse_brl_number(&number.folded).map(|n| n * 1000.0)
        }
        _ => None,
    }
}

/// Find the transaction amount.
///
/// A bare amount line beats numbers embedded in a sentence. Among embedded
/// numbers, one with a currency marker wins, otherwise the first candidate.
pub fn find_amount(text: &NormalizedText, lexicon: &Lexicon) -> Option<MoneyMention> {
    let lines: Vec<&str> = text.original.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() == 1 {
        if let Some(value) = bare_line_amount(lines[0], lexicon).filter(|v| within_limits(*v)) {
            return Some(MoneyMention {
                value,
                span: 0..text.tokens.len(),
                has_currency: text.tokens.iter().any(|t| lexicon.is_currency_word(&t.folded)),
                bare: true,
            });
        }
    } else {
        let mut offset = 0;
        for line in &lines {
            let width = tokenize(line).len();
            if let Some(value) = bare_line_amount(line, lexicon).filter(|v| within_limits(*v)) {
                return Some(MoneyMention {
                    value,
                    span: offset..offset + width,
                    has_currency: true,
                    bare: false,
                });
            }
            offset += width;
        }
    }

    let candidates = embedded_amounts(&text.tokens, lexicon);
    candidates
        .iter()
        .find(|m| m.has_currency)
        .or_else(|| candidates.first())
        .cloned()
}

fn embedded_amounts(tokens: &[Token], lexicon: &Lexicon) -> Vec<MoneyMention> {
    let mut found = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let Some(mut value) = parse_brl_number(&token.folded) else {
            continue;
        };
        let prev = i.checked_sub(1).map(|p| tokens[p].folded.as_str());
        let mut end = i + 1;

        if prev.map(|p| lexicon.is_date_marker(p)).unwrap_or(false) {
            continue;
        }
        if let Some(next) = tokens.get(end) {
            if lexicon.is_installment_word(&next.folded) || lexicon.is_quantity_unit(&next.folded) {
                continue;
            }
            if lexicon.is_thousand_word(&next.folded) {
                value *= 1000.0;
                end += 1;
            }
        }

        let prefixed = prev.map(|p| lexicon.is_currency_word(p)).unwrap_or(false);
        let suffixed = tokens
            .get(end)
            .map(|t| lexicon.is_currency_word(&t.folded))
            .unwrap_or(false);
        let has_currency = prefixed || suffixed;

        if !has_currency && is_integer_token(&token.folded) && value < QUANTITY_AMOUNT_THRESHOLD {
            let followed_by_word = tokens
                .get(end)
                .map(|t| is_plain_word(&t.folded, lexicon))
                .unwrap_or(false);
            if followed_by_word {
                continue;
            }
        }

        if !within_limits(value) {
            continue;
        }

        let start = if prefixed { i - 1 } else { i };
        let stop = if suffixed { end + 1 } else { end };
        found.push(MoneyMention {
            value,
            span: start..stop,
            has_currency,
            bare: false,
        });
    }

    found
}

/// Alphabetic content word: what a quantity counts ("2 televisões")
fn is_plain_word(folded: &str, lexicon: &Lexicon) -> bool {
    folded.chars().all(|c| c.is_alphabetic())
        && !lexicon.is_stop_word(folded)
        && !lexicon.is_currency_word(folded)
        && !lexicon.is_payment_word(folded)
}

/// Find an explicit installment count ("3x", "10 vezes", "à vista")
pub fn find_installments(tokens: &[Token], lexicon: &Lexicon) -> Option<InstallmentMention> {
    for (i, token) in tokens.iter().enumerate() {
        if let Some(count) = installment_token_count(&token.folded) {
            if (1..=MAX_INSTALLMENTS).contains(&count) {
                return Some(InstallmentMention {
                    count,
                    span: i..i + 1,
                });
            }
        }

        let count = if is_integer_token(&token.folded) {
            token.folded.parse::<u32>().ok()
        } else {
            lexicon.number_word(&token.folded)
        };
        let marked = tokens
            .get(i + 1)
            .map(|next| lexicon.is_installment_word(&next.folded))
            .unwrap_or(false);
        if let (Some(count), true) = (count, marked) {
            if (1..=MAX_INSTALLMENTS).contains(&count) {
                return Some(InstallmentMention {
                    count,
                    span: i..i + 2,
                });
            }
        }
    }

    lexicon
        .find_upfront(tokens)
        .map(|span| InstallmentMention { count: 1, span })
}

/// A bare count answering an installments question ("3", "três")
pub fn bare_count(tokens: &[Token], lexicon: &Lexicon) -> Option<u32> {
    let words: Vec<&Token> = tokens
        .iter()
        .filter(|t| !lexicon.is_stop_word(&t.folded))
        .collect();
    let count = match words.as_slice() {
        [word] if is_integer_token(&word.folded) => word.folded.parse::<u32>().ok(),
        [word] => lexicon.number_word(&word.folded),
        _ => None,
    }?;
    (1..=MAX_INSTALLMENTS).contains(&count).then_some(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::TextNormalizer;
    use expense_agent_config::LexiconConfig;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new(&LexiconConfig::default()).unwrap()
    }

    fn amount(text: &str) -> Option<f64> {
        let n = normalizer();
        find_amount(&n.normalize(text), n.lexicon()).map(|m| m.value)
    }

    fn installments(text: &str) -> Option<u32> {
        let n = normalizer();
        find_installments(&n.normalize(text).tokens, n.lexicon()).map(|m| m.count)
    }

    #[test]
    fn test_parse_brl_number() {
        assert_eq!(parse_brl_number("1.234,56"), Some(1234.56));
        assert_eq!(parse_brl_number("47,90"), Some(47.9));
        assert_eq!(parse_brl_number("47.90"), Some(47.9));
        assert_eq!(parse_brl_number("1.500"), Some(1500.0));
        assert_eq!(parse_brl_number("80"), Some(80.0));
        assert_eq!(parse_brl_number("3x"), None);
        assert_eq!(parse_brl_number("abc"), None);
    }

    #[test]
    fn test_embedded_amount() {
        assert_eq!(amount("gastei 80 no barbeiro no pix"), Some(80.0));
        assert_eq!(amount("compramos 47 reais no crédito Latam"), Some(47.0));
        assert_eq!(amount("hoje gastei 50 no mercado"), Some(50.0));
        assert_eq!(amount("gastei 10 no mercado"), Some(10.0));
    }

    #[test]
    fn test_currency_marker_wins() {
        assert_eq!(amount("comprei 30 pães por R$ 15"), Some(15.0));
        assert_eq!(amount("2 pizzas 90 reais"), Some(90.0));
    }

    #[test]
    fn test_quantities_are_not_amounts() {
        assert_eq!(amount("comprei 2 televisões"), None);
        assert_eq!(amount("5 kg de arroz"), None);
        assert_eq!(amount("vence dia 10"), None);
        assert_eq!(amount("em 3 vezes"), None);
        assert_eq!(amount("3x no nubank"), None);
    }

    #[test]
    fn test_thousands() {
        assert_eq!(amount("paguei 2 mil no sofá"), Some(2000.0));
        assert_eq!(amount("geladeira de R$ 3.499,90"), Some(3499.9));
    }

    #[test]
    fn test_bare_line_wins() {
        let n = normalizer();
        let text = n.normalize("comprei 2 cadeiras\n350");
        let money = find_amount(&text, n.lexicon()).unwrap();
        assert_eq!(money.value, 350.0);

        let bare = find_amount(&n.normalize("R$ 47,90"), n.lexicon()).unwrap();
        assert!(bare.bare);
        assert_eq!(bare.value, 47.9);
    }

    #[test]
    fn test_installments() {
        assert_eq!(installments("tênis em 3x no nubank"), Some(3));
        assert_eq!(installments("parcelei em 10 vezes"), Some(10));
        assert_eq!(installments("em três parcelas"), Some(3));
        assert_eq!(installments("foi à vista"), Some(1));
        assert_eq!(installments("gastei 80 no pix"), None);
        assert_eq!(installments("em 99x"), None);
    }

    #[test]
    fn test_bare_count() {
        let n = normalizer();
        assert_eq!(bare_count(&n.normalize("3").tokens, n.lexicon()), Some(3));
        assert_eq!(bare_count(&n.normalize("em doze").tokens, n.lexicon()), Some(12));
        assert_eq!(bare_count(&n.normalize("mercado").tokens, n.lexicon()), None);
    }
}
