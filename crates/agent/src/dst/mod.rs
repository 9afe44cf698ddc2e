//! Dialogue State Management for Expense Conversations
//!
//! One call per user message. The manager takes the stored conversation,
//! reads the message, merges what it carried and either emits a
//! `TransactionDraft` or asks the next question.
//!
//! # Phases
//!
//! - `Idle` → `Collecting`: any message
//! - `Collecting` → `Resolving`: amount, description, payment method and
//!   responsible party are all known
//! - `Resolving` → `Blocked`: a mention is ambiguous or unknown, or a credit
//!   purchase still needs its card or installment count
//! - `Resolving` → `Ready`: every record resolved; the draft is emitted and
//!   the conversation is finished
//!
//! The manager holds no per-user state. Callers store what comes back.
//!
//! # Example
//!
//! ```ignore
//! use expense_agent_agent::dst::DialogueStateManager;
//!
//! let manager = DialogueStateManager::new(&AgentSettings::default())?;
//! let result = manager.process_turn("5511999990000", "gastei 80 no barbeiro no pix",
//!     &directory, None, Utc::now());
//! ```

pub mod extractor;
pub mod slots;

pub use extractor::{ExtractionContext, SlotExtractor};
pub use slots::{DescriptionIssue, DescriptionValidator, ExtractedSlots};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use expense_agent_config::{AgentSettings, DialogueSettings, PromptTemplates};
use expense_agent_core::{
    ClarificationRequest, ConversationState, DialoguePhase, DirectoryEntry, DirectoryMatch,
    OrgDirectory, PaymentMethod, PendingQuestion, ResolutionResult, ResponsibleHint,
    ResponsibleParty, SlotName, TransactionDraft, Turn, TurnError,
};
use expense_agent_text_processing::{LexiconError, NormalizedText, TextNormalizer};

use crate::assembler::{ResolvedEntities, TransactionAssembler};
use crate::classifier::CategoryClassifier;
use crate::resolver::EntityResolver;

/// What a turn produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Transaction complete, ready for persistence
    Draft { draft: TransactionDraft },
    /// More information needed
    Ask { clarification: ClarificationRequest },
    /// The user discarded the conversation
    Reset { message: String, discarded: bool },
}

/// Outcome plus the state to keep
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    pub outcome: TurnOutcome,
    /// State for the next turn; `None` when the conversation is finished
    pub state: Option<ConversationState>,
    /// State at the moment the draft was emitted. Callers keep it instead of
    /// `state` when persisting the draft fails, so nothing has to be re-asked.
    pub finalized: Option<ConversationState>,
}

impl TurnResult {
    pub fn draft(&self) -> Option<&TransactionDraft> {
        match &self.outcome {
            TurnOutcome::Draft { draft } => Some(draft),
            _ => None,
        }
    }

    pub fn clarification(&self) -> Option<&ClarificationRequest> {
        match &self.outcome {
            TurnOutcome::Ask { clarification } => Some(clarification),
            _ => None,
        }
    }
}

/// A question that stops resolution
struct Blocked {
    clarification: ClarificationRequest,
    pending: PendingQuestion,
}

/// Description chosen across the user's turns
#[derive(Debug, Default)]
struct DescriptionPick {
    valid: Option<String>,
    /// Newest rejected candidate, quoted back when asking again
    rejected: Option<String>,
}

/// Turn-by-turn dialogue driver
#[derive(Debug, Clone)]
pub struct DialogueStateManager {
    extractor: SlotExtractor,
    classifier: CategoryClassifier,
    assembler: TransactionAssembler,
    prompts: PromptTemplates,
    settings: DialogueSettings,
}

impl DialogueStateManager {
    pub fn new(settings: &AgentSettings) -> Result<Self, LexiconError> {
        let normalizer = TextNormalizer::new(&settings.lexicon)?;
        Ok(Self {
            extractor: SlotExtractor::new(normalizer, settings.dialogue.min_new_transaction_chars),
            classifier: CategoryClassifier::new(&settings.taxonomy),
            assembler: TransactionAssembler::new(settings.dialogue.rounding),
            prompts: settings.prompts.clone(),
            settings: settings.dialogue.clone(),
        })
    }

    pub fn prompts(&self) -> &PromptTemplates {
        &self.prompts
    }

    pub fn settings(&self) -> &DialogueSettings {
        &self.settings
    }

    pub fn extractor(&self) -> &SlotExtractor {
        &self.extractor
    }

    /// Process one user message
    pub fn process_turn(
        &self,
        conversation_id: &str,
        raw_text: &str,
        directory: &OrgDirectory,
        prior: Option<ConversationState>,
        now: DateTime<Utc>,
    ) -> TurnResult {
        let ttl = self.settings.ttl();
        let prior = prior.filter(|state| {
            let live = !state.is_expired(now, ttl);
            if !live {
                tracing::debug!(conversation = conversation_id, "Conversation expired, starting over");
            }
            live
        });

        let text = self.extractor.normalize(raw_text);

        if self.extractor.is_reset(&text) {
            let discarded = prior
                .as_ref()
                .map(|s| !s.turns.is_empty() || !s.slots.is_empty())
                .unwrap_or(false);
            let message = if discarded {
                self.prompts.responses.reset.clone()
            } else {
                self.prompts.responses.nothing_to_reset.clone()
            };
            tracing::info!(conversation = conversation_id, discarded, "Conversation reset");
            return TurnResult {
                outcome: TurnOutcome::Reset { message, discarded },
                state: None,
                finalized: None,
            };
        }

        let mut state =
            prior.unwrap_or_else(|| ConversationState::new(conversation_id, now));
        state.touch(now);

        let mut extracted = self.extract(&text, &state, directory);
        // "gastei 50" answering the amount question completes the open draft
        let fills_pending = state
            .pending
            .as_ref()
            .map(|q| extracted.answered == Some(q.slot) && extracted.description.is_none())
            .unwrap_or(false);
        if !state.turns.is_empty()
            && !fills_pending
            && self.extractor.starts_new_transaction(&text, &extracted)
        {
            tracing::debug!(conversation = conversation_id, "New transaction replaces open one");
            state.reset();
            extracted = self.extract(&text, &state, directory);
        }

        // A finished draft that failed to save: any follow-up retries it
        let description = if state.phase == DialoguePhase::Ready {
            tracing::debug!(conversation = conversation_id, "Retrying finished draft");
            DescriptionPick::default()
        } else {
            let mut turn = Turn::user(raw_text);
            turn.answered = extracted.answered;
            state.push_turn(turn, self.settings.history_window);

            if let Some(question) = state.pending.take() {
                extracted.apply_selection(question.slot, &mut state.slots);
            }
            extracted.merge_into(&mut state.slots);
            state.phase = DialoguePhase::Collecting;

            let description = self.best_description(&state, directory);
            state.slots.description = description.valid.clone();
            description
        };
        state.slots.apply_payment_invariants();

        tracing::debug!(
            conversation = conversation_id,
            amount = ?state.slots.amount,
            description = ?state.slots.description,
            payment = ?state.slots.payment_method,
            responsible = ?state.slots.responsible,
            "Slots updated"
        );

        let missing: Vec<SlotName> = SlotName::CORE
            .iter()
            .copied()
            .filter(|slot| self.is_missing(*slot, &state))
            .collect();
        if let Some(first) = missing.first().copied() {
            let prompt = missing
                .iter()
                .map(|slot| match (slot, &description.rejected) {
                    (SlotName::Description, Some(rejected)) => {
                        self.prompts.invalid_description(rejected)
                    }
                    _ => self.prompts.question(*slot).to_string(),
                })
                .collect::<Vec<_>>()
                .join(" ");
            let err = TurnError::ExtractionMissing(missing.clone());
            tracing::debug!(conversation = conversation_id, error = %err, "Asking for slots");
            return self.ask(
                state,
                Blocked {
                    clarification: ClarificationRequest::missing(missing, prompt),
                    pending: PendingQuestion::ask(first),
                },
            );
        }

        state.phase = DialoguePhase::Resolving;
        let resolved = match self.resolve(&mut state, directory) {
            Ok(resolved) => resolved,
            Err(blocked) => {
                state.phase = DialoguePhase::Blocked;
                return self.ask(state, blocked);
            }
        };

        match self.assembler.assemble(&state.slots, resolved) {
            Ok(draft) => {
                state.phase = DialoguePhase::Ready;
                tracing::info!(
                    conversation = conversation_id,
                    amount = draft.amount,
                    category = %draft.category_name,
                    payment = %draft.payment_method,
                    installments = draft.installment_count(),
                    "Transaction draft ready"
                );
                TurnResult {
                    outcome: TurnOutcome::Draft { draft },
                    state: None,
                    finalized: Some(state),
                }
            }
            Err(err) => {
                let slot = err.slot().unwrap_or(SlotName::Description);
                tracing::warn!(conversation = conversation_id, error = %err, "Draft rejected");
                state.phase = DialoguePhase::Collecting;
                let prompt = self.prompts.question(slot).to_string();
                self.ask(
                    state,
                    Blocked {
                        clarification: ClarificationRequest::missing(vec![slot], prompt),
                        pending: PendingQuestion::ask(slot),
                    },
                )
            }
        }
    }

    fn extract(
        &self,
        text: &NormalizedText,
        state: &ConversationState,
        directory: &OrgDirectory,
    ) -> ExtractedSlots {
        let ctx = ExtractionContext {
            pending: state.pending.as_ref(),
            slots: &state.slots,
            directory,
        };
        self.extractor.extract(text, &ctx)
    }

    fn is_missing(&self, slot: SlotName, state: &ConversationState) -> bool {
        let slots = &state.slots;
        match slot {
            SlotName::Amount => !slots.has_amount(),
            SlotName::Description => !slots.has_description(),
            SlotName::PaymentMethod => slots.payment_method.is_none(),
            SlotName::Responsible => slots.responsible.is_none(),
            SlotName::Card | SlotName::Installments | SlotName::Category => false,
        }
    }

    /// Newest valid description among user turns that were not answers to
    /// some other question
    fn best_description(&self, state: &ConversationState, directory: &OrgDirectory) -> DescriptionPick {
        let validator = DescriptionValidator::new(self.extractor.lexicon());
        let mut pick = DescriptionPick::default();

        for turn in state.user_turns().rev() {
            if matches!(turn.answered, Some(slot) if slot != SlotName::Description) {
                continue;
            }
            let Some(candidate) = self.extractor.description_candidate(&turn.text, directory)
            else {
                continue;
            };
            match validator.check(&candidate) {
                Ok(()) => {
                    pick.valid = Some(candidate);
                    return pick;
                }
                Err(issue) => {
                    let err = TurnError::InvalidDescription(candidate.clone());
                    tracing::debug!(?issue, error = %err, "Description rejected");
                    pick.rejected.get_or_insert(candidate);
                }
            }
        }
        pick
    }

    /// Resolve responsible, card, installments and category, in that order
    fn resolve(
        &self,
        state: &mut ConversationState,
        directory: &OrgDirectory,
    ) -> Result<ResolvedEntities, Blocked> {
        let responsible = self.resolve_responsible(state, directory)?;
        let card = self.resolve_card(state, directory)?;

        if state.slots.payment_method == Some(PaymentMethod::Credit)
            && state.slots.installments.is_none()
        {
            return Err(self.question(SlotName::Installments));
        }

        let category = self.resolve_category(state, directory)?;

        Ok(ResolvedEntities {
            responsible,
            card,
            category,
        })
    }

    fn resolve_responsible(
        &self,
        state: &mut ConversationState,
        directory: &OrgDirectory,
    ) -> Result<ResponsibleParty, Blocked> {
        let people = names(&directory.cost_centers);
        let hint = state.slots.responsible.clone();

        match hint {
            Some(ResponsibleHint::Shared) => Ok(ResponsibleParty::Shared),
            Some(ResponsibleHint::SelfUser) => match directory.requester() {
                Some(me) => Ok(ResponsibleParty::CostCenter {
                    id: me.id.clone(),
                    name: me.name.clone(),
                }),
                None => {
                    tracing::debug!("Requester has no cost center, asking");
                    state.slots.clear(SlotName::Responsible);
                    Err(self.choice(SlotName::Responsible, people))
                }
            },
            Some(ResponsibleHint::Named(mention)) => {
                match EntityResolver::resolve(&mention, &directory.cost_centers) {
                    ResolutionResult::Resolved(m) => Ok(ResponsibleParty::CostCenter {
                        id: m.id,
                        name: m.name,
                    }),
                    ambiguous @ ResolutionResult::Ambiguous { .. } => Err(self.ambiguous(
                        SlotName::Responsible,
                        &mention,
                        ambiguous.candidate_names(),
                    )),
                    ResolutionResult::NotFound => {
                        state.slots.clear(SlotName::Responsible);
                        Err(self.not_found(SlotName::Responsible, &mention, people))
                    }
                }
            }
            None => Err(self.question(SlotName::Responsible)),
        }
    }

    fn resolve_card(
        &self,
        state: &mut ConversationState,
        directory: &OrgDirectory,
    ) -> Result<Option<DirectoryMatch>, Blocked> {
        let Some(method) = state.slots.payment_method else {
            return Ok(None);
        };
        let credit = method == PaymentMethod::Credit;
        if !method.uses_card() || (!credit && state.slots.card_name.is_none()) {
            return Ok(None);
        }

        let active = directory.active_cards();
        let card_names = names(active.iter().copied());

        let Some(mention) = state.slots.card_name.clone() else {
            return match active.as_slice() {
                [] => {
                    tracing::warn!("Credit purchase but no active cards");
                    Ok(None)
                }
                [only] if self.settings.auto_select_single_card => {
                    tracing::debug!(card = %only.name, "Single active card selected");
                    Ok(Some(DirectoryMatch::from_entry(*only)))
                }
                _ => Err(self.choice(SlotName::Card, card_names)),
            };
        };

        match EntityResolver::resolve(&mention, active.iter().copied()) {
            ResolutionResult::Resolved(m) => Ok(Some(m)),
            ambiguous @ ResolutionResult::Ambiguous { .. } => Err(self.ambiguous(
                SlotName::Card,
                &mention,
                ambiguous.candidate_names(),
            )),
            ResolutionResult::NotFound => {
                state.slots.clear(SlotName::Card);
                if !credit || active.is_empty() {
                    tracing::debug!(mention = %mention, "Card not found, recording without card");
                    Ok(None)
                } else {
                    Err(self.not_found(SlotName::Card, &mention, card_names))
                }
            }
        }
    }

    fn resolve_category(
        &self,
        state: &mut ConversationState,
        directory: &OrgDirectory,
    ) -> Result<DirectoryMatch, Blocked> {
        let result = match state.slots.category.clone() {
            Some(mention) => match self.classifier.classify_explicit(&mention, directory) {
                ambiguous @ ResolutionResult::Ambiguous { .. } => {
                    return Err(self.ambiguous(
                        SlotName::Category,
                        &mention,
                        ambiguous.candidate_names(),
                    ));
                }
                other => other,
            },
            None => {
                let description = state.slots.description.clone().unwrap_or_default();
                self.classifier.infer(&description, directory)
            }
        };

        match result {
            ResolutionResult::Resolved(m) => Ok(m),
            ambiguous @ ResolutionResult::Ambiguous { .. } => {
                Err(self.choice(SlotName::Category, ambiguous.candidate_names()))
            }
            ResolutionResult::NotFound => {
                tracing::warn!("No expense categories available");
                state.slots.clear(SlotName::Category);
                Err(self.question(SlotName::Category))
            }
        }
    }

    fn question(&self, slot: SlotName) -> Blocked {
        Blocked {
            clarification: ClarificationRequest::missing(vec![slot], self.prompts.question(slot)),
            pending: PendingQuestion::ask(slot),
        }
    }

    fn choice(&self, slot: SlotName, options: Vec<String>) -> Blocked {
        if options.is_empty() {
            return self.question(slot);
        }
        Blocked {
            clarification: ClarificationRequest::choose(
                slot,
                options.clone(),
                self.prompts.choose(slot, &options),
            ),
            pending: PendingQuestion::choose(slot, options),
        }
    }

    fn ambiguous(&self, slot: SlotName, mention: &str, options: Vec<String>) -> Blocked {
        let err = TurnError::ExtractionAmbiguous {
            slot,
            candidates: options.clone(),
        };
        tracing::debug!(error = %err, "Asking to disambiguate");
        Blocked {
            clarification: ClarificationRequest::choose(
                slot,
                options.clone(),
                self.prompts.ambiguous(mention, &options),
            ),
            pending: PendingQuestion::choose(slot, options),
        }
    }

    fn not_found(&self, slot: SlotName, mention: &str, options: Vec<String>) -> Blocked {
        let err = TurnError::EntityNotFound {
            slot,
            mention: mention.to_string(),
        };
        tracing::debug!(error = %err, "Mention not found");
        if options.is_empty() {
            return self.question(slot);
        }
        Blocked {
            clarification: ClarificationRequest::choose(
                slot,
                options.clone(),
                self.prompts.not_found(mention, &options),
            ),
            pending: PendingQuestion::choose(slot, options),
        }
    }

    fn ask(&self, mut state: ConversationState, blocked: Blocked) -> TurnResult {
        let Blocked {
            clarification,
            pending,
        } = blocked;
        state.pending = Some(pending);
        state.push_turn(
            Turn::assistant(clarification.prompt_text.clone()),
            self.settings.history_window,
        );
        tracing::debug!(
            conversation = %state.conversation_id,
            slot = %clarification.slot,
            phase = ?state.phase,
            "Clarification requested"
        );
        TurnResult {
            outcome: TurnOutcome::Ask { clarification },
            state: Some(state),
            finalized: None,
        }
    }
}

fn names<'a, E, I>(entries: I) -> Vec<String>
where
    E: DirectoryEntry + 'a,
    I: IntoIterator<Item = &'a E>,
{
    entries
        .into_iter()
        .map(|e| e.entry_name().to_string())
        .collect()
}
