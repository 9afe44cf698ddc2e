//! Slot Extraction for Expense Messages
//!
//! Reads one normalized message into `ExtractedSlots`. Extraction is
//! positional: every slot claims the token positions it was read from, and
//! the description is whatever meaningful words are left.
//!
//! The open question, if any, changes how short answers are read: a bare
//! "3" is an installment count when installments were asked, an amount
//! otherwise.

use std::collections::HashSet;
use std::ops::Range;

use expense_agent_config::constants::extraction::RESET_MAX_TOKENS;
use expense_agent_core::{
    OrgDirectory, PaymentMethod, PendingQuestion, ResolutionResult, ResponsibleHint, SlotName,
    TransactionSlots,
};
use expense_agent_text_processing::entities::{installment_token_count, is_integer_token};
use expense_agent_text_processing::{
    bare_count, find_amount, find_installments, find_phrase, tokenize, Lexicon, NormalizedText,
    TextNormalizer, Token,
};

use super::slots::ExtractedSlots;
use crate::resolver::EntityResolver;

/// Longest mention read after an owner or category marker
const MENTION_MAX_TOKENS: usize = 3;

/// What the extractor needs to know about the conversation so far
#[derive(Debug, Clone, Copy)]
pub struct ExtractionContext<'a> {
    pub pending: Option<&'a PendingQuestion>,
    pub slots: &'a TransactionSlots,
    pub directory: &'a OrgDirectory,
}

impl<'a> ExtractionContext<'a> {
    /// Context for reading a message on its own, outside any question
    pub fn detached(slots: &'a TransactionSlots, directory: &'a OrgDirectory) -> Self {
        Self {
            pending: None,
            slots,
            directory,
        }
    }

    fn pending_slot(&self) -> Option<SlotName> {
        self.pending.map(|q| q.slot)
    }

    fn asked(&self, slot: SlotName) -> bool {
        self.pending_slot() == Some(slot)
    }
}

/// Rule-based slot extractor
#[derive(Debug, Clone)]
pub struct SlotExtractor {
    normalizer: TextNormalizer,
    min_new_transaction_chars: usize,
}

impl SlotExtractor {
    pub fn new(normalizer: TextNormalizer, min_new_transaction_chars: usize) -> Self {
        Self {
            normalizer,
            min_new_transaction_chars,
        }
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    pub fn lexicon(&self) -> &Lexicon {
        self.normalizer.lexicon()
    }

    pub fn normalize(&self, text: &str) -> NormalizedText {
        self.normalizer.normalize(text)
    }

    /// "cancela", "esquece isso": a reset word leading a short message
    pub fn is_reset(&self, text: &NormalizedText) -> bool {
        let meaningful = self.normalizer.meaningful_tokens(&text.tokens);
        match meaningful.first() {
            Some(first) => {
                self.lexicon().is_reset_word(&first.folded) && meaningful.len() <= RESET_MAX_TOKENS
            }
            None => false,
        }
    }

    /// A message that opens a new transaction: action verb, amount and
    /// enough text to stand on its own
    pub fn starts_new_transaction(&self, text: &NormalizedText, extracted: &ExtractedSlots) -> bool {
        extracted.has_action_verb
            && extracted.amount.is_some()
            && text.folded_len() >= self.min_new_transaction_chars
    }

    /// Extract every slot the message carries
    pub fn extract(&self, text: &NormalizedText, ctx: &ExtractionContext<'_>) -> ExtractedSlots {
        let lexicon = self.lexicon();
        let tokens = &text.tokens;
        let mut out = ExtractedSlots::default();
        let mut consumed: HashSet<usize> = HashSet::new();

        if let Some(question) = ctx.pending.filter(|q| q.has_options()) {
            if let Some(choice) = EntityResolver::pick_option(text, &question.options) {
                tracing::debug!(slot = %question.slot, choice = %choice, "Option selected");
                out.selected_option = Some(choice);
                out.answered = Some(question.slot);
                return out;
            }
        }

        out.has_action_verb = tokens.iter().any(|t| lexicon.is_action_verb(&t.folded));
        let meaningful = self.normalizer.meaningful_tokens(tokens);
        out.is_confirmation =
            !meaningful.is_empty() && meaningful.iter().all(|t| lexicon.is_confirmation(&t.folded));

        // Card, with a trailing "3x" read as part of it
        if let Some((mention, span)) = self.find_card(tokens, ctx) {
            let after = span.end;
            consumed.extend(span);
            out.card_name = Some(mention);
            if let Some(count) = tokens.get(after).and_then(|t| installment_token_count(&t.folded)) {
                out.installments = Some(count);
                consumed.insert(after);
            }
        }

        if let Some(payment) = lexicon.find_payment(tokens) {
            out.payment_method = Some(payment.method);
            consumed.extend(payment.span);
        }

        for (i, token) in tokens.iter().enumerate() {
            if lexicon.is_split_word(&token.folded) {
                out.split_requested = true;
                consumed.insert(i);
            }
        }

        let explicit_split = self.read_installments(text, ctx, &mut out, &mut consumed);

        // A lone integer answering a list or the installment question is never
        // an amount, even when it is out of range for either
        let bare_integer = meaningful.len() == 1 && is_integer_token(&meaningful[0].folded);
        let index_answer = bare_integer
            && (ctx.pending.map(|q| q.has_options()).unwrap_or(false)
                || ctx.asked(SlotName::Installments));
        if !index_answer {
            if let Some(money) = find_amount(text, lexicon) {
                if !money.span.clone().any(|i| consumed.contains(&i)) {
                    out.amount = Some(money.value);
                    consumed.extend(money.span);
                }
            }
        }

        let credit_known = ctx.slots.payment_method.is_some();
        if out.payment_method.is_none()
            && !credit_known
            && (out.card_name.is_some() || out.split_requested || explicit_split)
        {
            out.payment_method = Some(PaymentMethod::Credit);
        }

        let standalone = self.standalone_responsible(tokens, ctx, &mut consumed);
        let answered_responsible = standalone.is_some();
        out.responsible = standalone.or_else(|| self.find_responsible(tokens, ctx, &mut consumed));
        out.category = self.find_category(tokens, ctx, &mut consumed);

        if out.card_name.is_none() && ctx.asked(SlotName::Card) {
            let words = self.leftover_words(tokens, &consumed, |t| {
                !lexicon.is_instrument_word(&t.folded)
            });
            if !words.is_empty() {
                out.card_name = Some(join_raw(tokens, &words));
                consumed.extend(words);
            }
        }

        // "sim", "ok" never describe a purchase
        if !out.is_confirmation {
            out.description = self.normalizer.core_description(tokens, &consumed);
        }

        out.answered = ctx.pending_slot().filter(|slot| match slot {
            SlotName::Amount => out.amount.is_some(),
            SlotName::Description => out.description.is_some(),
            SlotName::PaymentMethod => out.payment_method.is_some(),
            SlotName::Card => out.card_name.is_some(),
            SlotName::Installments => out.installments.is_some(),
            SlotName::Responsible => out.responsible.is_some(),
            SlotName::Category => out.category.is_some(),
        });
        if out.answered.is_none() && answered_responsible {
            out.answered = Some(SlotName::Responsible);
        }

        out
    }

    /// Description candidate of a past message, read on its own
    pub fn description_candidate(&self, text: &str, directory: &OrgDirectory) -> Option<String> {
        let slots = TransactionSlots::default();
        let ctx = ExtractionContext::detached(&slots, directory);
        self.extract(&self.normalize(text), &ctx).description
    }

    /// Installment count; returns whether an in-sentence split ("em 3x") was read
    fn read_installments(
        &self,
        text: &NormalizedText,
        ctx: &ExtractionContext<'_>,
        out: &mut ExtractedSlots,
        consumed: &mut HashSet<usize>,
    ) -> bool {
        if out.installments.is_some() {
            return out.installments.map(|n| n > 1).unwrap_or(false);
        }

        let lexicon = self.lexicon();
        let tokens = &text.tokens;
        let asked = ctx.asked(SlotName::Installments);
        let credit = ctx.slots.payment_method == Some(PaymentMethod::Credit)
            || out.payment_method == Some(PaymentMethod::Credit);

        if let Some(mention) = find_installments(tokens, lexicon) {
            let meaningful_outside = tokens.iter().enumerate().any(|(i, t)| {
                !mention.span.contains(&i) && !lexicon.is_stop_word(&t.folded)
            });
            let bare = !meaningful_outside;
            if !bare || asked || credit {
                out.installments = Some(mention.count);
                consumed.extend(mention.span);
                return !bare && mention.count > 1;
            }
            return false;
        }

        let split_pending = ctx.slots.split_requested && !ctx.asked(SlotName::Amount);
        if asked || (credit && split_pending) {
            if let Some(count) = bare_count(tokens, lexicon) {
                out.installments = Some(count);
                consumed.extend(
                    tokens
                        .iter()
                        .enumerate()
                        .filter(|(_, t)| !lexicon.is_stop_word(&t.folded))
                        .map(|(i, _)| i),
                );
            }
        }
        false
    }

    /// Card mention: full card name, a card's first word, or "cartão X"
    fn find_card(&self, tokens: &[Token], ctx: &ExtractionContext<'_>) -> Option<(String, Range<usize>)> {
        let lexicon = self.lexicon();
        let cards = ctx.directory.active_cards();

        let mut best: Option<(String, Range<usize>)> = None;
        for card in &cards {
            let phrase: Vec<String> = tokenize(&card.name).into_iter().map(|t| t.folded).collect();
            if let Some(start) = find_phrase(tokens, &phrase) {
                let span = start..start + phrase.len();
                let better = match &best {
                    Some((_, current)) => {
                        span.len() > current.len()
                            || (span.len() == current.len() && span.start < current.start)
                    }
                    None => true,
                };
                if better {
                    best = Some((card.name.clone(), span));
                }
            }
        }
        if best.is_some() {
            return best;
        }

        let first_words: Vec<String> = cards
            .iter()
            .filter_map(|c| tokenize(&c.name).into_iter().next().map(|t| t.folded))
            .collect();
        for (i, token) in tokens.iter().enumerate() {
            if token.folded.chars().count() >= 3
                && !lexicon.is_stop_word(&token.folded)
                && first_words.iter().any(|w| *w == token.folded)
            {
                return Some((token.raw.clone(), i..i + 1));
            }
        }

        for (i, token) in tokens.iter().enumerate() {
            if !lexicon.is_card_marker(&token.folded) {
                continue;
            }
            let mut j = i + 1;
            while tokens.get(j).map(|t| lexicon.is_stop_word(&t.folded)).unwrap_or(false) {
                j += 1;
            }
            if let Some(next) = tokens.get(j) {
                if self.is_mention_word(next) {
                    return Some((next.raw.clone(), i..j + 1));
                }
            }
        }

        None
    }

    /// "família", "eu", "Marina": a reply naming only the owner while the
    /// responsible party is still unknown and some other slot was asked.
    /// Answers to the description question stay descriptions.
    fn standalone_responsible(
        &self,
        tokens: &[Token],
        ctx: &ExtractionContext<'_>,
        consumed: &mut HashSet<usize>,
    ) -> Option<ResponsibleHint> {
        if ctx.pending.is_none()
            || ctx.asked(SlotName::Responsible)
            || ctx.asked(SlotName::Description)
            || ctx.slots.responsible.is_some()
        {
            return None;
        }
        let lexicon = self.lexicon();
        let is_hint = |t: &Token| lexicon.is_shared_hint(&t.folded) || lexicon.is_self_hint(&t.folded);

        let open: Vec<usize> = (0..tokens.len())
            .filter(|i| !consumed.contains(i))
            .filter(|&i| is_hint(&tokens[i]) || !lexicon.is_stop_word(&tokens[i].folded))
            .collect();
        if open.is_empty() {
            return None;
        }

        if open.iter().all(|&i| is_hint(&tokens[i])) {
            let shared = open.iter().any(|&i| lexicon.is_shared_hint(&tokens[i].folded));
            consumed.extend(open);
            return Some(if shared {
                ResponsibleHint::Shared
            } else {
                ResponsibleHint::SelfUser
            });
        }

        if open.len() > MENTION_MAX_TOKENS || !open.iter().all(|&i| self.is_mention_word(&tokens[i])) {
            return None;
        }
        let mention = join_raw(tokens, &open);
        match EntityResolver::resolve(&mention, &ctx.directory.cost_centers) {
            ResolutionResult::NotFound => None,
            _ => {
                consumed.extend(open);
                Some(ResponsibleHint::Named(mention))
            }
        }
    }

    /// Responsible party: owner phrase, an answer to the question, or the verb
    fn find_responsible(
        &self,
        tokens: &[Token],
        ctx: &ExtractionContext<'_>,
        consumed: &mut HashSet<usize>,
    ) -> Option<ResponsibleHint> {
        let lexicon = self.lexicon();

        // "despesa da família", "gasto do Felipe"
        for i in 0..tokens.len().saturating_sub(2) {
            if !lexicon.is_responsible_marker(&tokens[i].folded)
                || !lexicon.is_owner_preposition(&tokens[i + 1].folded)
            {
                continue;
            }
            let start = i + 2;
            let mut end = start;
            while end < tokens.len() && end - start < 2 && self.is_mention_word(&tokens[end]) {
                end += 1;
            }
            if end == start {
                continue;
            }

            let words = &tokens[start..end];
            if words.iter().any(|t| lexicon.is_shared_hint(&t.folded)) {
                consumed.extend(i..end);
                return Some(ResponsibleHint::Shared);
            }
            if words.iter().any(|t| lexicon.is_self_hint(&t.folded)) {
                consumed.extend(i..end);
                return Some(ResponsibleHint::SelfUser);
            }
            for len in (1..=words.len()).rev() {
                let mention = join_tokens(&words[..len]);
                let found = EntityResolver::resolve(&mention, &ctx.directory.cost_centers);
                if found != ResolutionResult::NotFound {
                    consumed.extend(i..start + len);
                    return Some(ResponsibleHint::Named(mention));
                }
            }
        }

        if ctx.asked(SlotName::Responsible) {
            let answer: Vec<usize> = (0..tokens.len()).filter(|i| !consumed.contains(i)).collect();
            if answer.iter().any(|&i| lexicon.is_shared_hint(&tokens[i].folded)) {
                consumed.extend(answer);
                return Some(ResponsibleHint::Shared);
            }
            if answer.iter().any(|&i| lexicon.is_self_hint(&tokens[i].folded)) {
                consumed.extend(answer);
                return Some(ResponsibleHint::SelfUser);
            }
            let words = self.leftover_words(tokens, consumed, |t| {
                !lexicon.is_owner_preposition(&t.folded) && !lexicon.is_action_verb(&t.folded)
            });
            if !words.is_empty() {
                let mention = join_raw(tokens, &words);
                consumed.extend(words);
                return Some(ResponsibleHint::Named(mention));
            }
        }

        tokens.iter().find_map(|t| {
            if lexicon.is_singular_verb(&t.folded) {
                Some(ResponsibleHint::SelfUser)
            } else if lexicon.is_plural_verb(&t.folded) {
                Some(ResponsibleHint::Shared)
            } else {
                None
            }
        })
    }

    /// Explicit category: "categoria lazer", or the answer to the question
    fn find_category(
        &self,
        tokens: &[Token],
        ctx: &ExtractionContext<'_>,
        consumed: &mut HashSet<usize>,
    ) -> Option<String> {
        let lexicon = self.lexicon();

        for (i, token) in tokens.iter().enumerate() {
            if !lexicon.is_category_marker(&token.folded) || consumed.contains(&i) {
                continue;
            }
            let mut start = i + 1;
            while tokens.get(start).map(|t| lexicon.is_stop_word(&t.folded)).unwrap_or(false) {
                start += 1;
            }
            let mut end = start;
            while end < tokens.len()
                && end - start < MENTION_MAX_TOKENS
                && !consumed.contains(&end)
                && self.is_mention_word(&tokens[end])
            {
                end += 1;
            }
            if end > start {
                consumed.extend(i..end);
                return Some(join_tokens(&tokens[start..end]));
            }
        }

        if ctx.asked(SlotName::Category) {
            let words = self.leftover_words(tokens, consumed, |_| true);
            if !words.is_empty() {
                let mention = join_raw(tokens, &words);
                consumed.extend(words);
                return Some(mention);
            }
        }

        None
    }

    /// Alphabetic word that can be part of a name
    fn is_mention_word(&self, token: &Token) -> bool {
        let lexicon = self.lexicon();
        let word = token.folded.as_str();
        word.chars().all(|c| c.is_alphabetic() || c == '-')
            && !lexicon.is_stop_word(word)
            && !lexicon.is_payment_word(word)
            && !lexicon.is_currency_word(word)
            && !lexicon.is_action_verb(word)
            && !lexicon.is_installment_word(word)
            && !lexicon.is_split_word(word)
            && !lexicon.is_date_marker(word)
            && !lexicon.is_thousand_word(word)
    }

    /// Unclaimed mention words, at most `MENTION_MAX_TOKENS`
    fn leftover_words(
        &self,
        tokens: &[Token],
        consumed: &HashSet<usize>,
        keep: impl Fn(&Token) -> bool,
    ) -> Vec<usize> {
        tokens
            .iter()
            .enumerate()
            .filter(|(i, t)| !consumed.contains(i) && self.is_mention_word(t) && keep(*t))
            .map(|(i, _)| i)
            .take(MENTION_MAX_TOKENS)
            .collect()
    }
}

fn join_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.raw.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_raw(tokens: &[Token], positions: &[usize]) -> String {
    positions
        .iter()
        .map(|&i| tokens[i].raw.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
