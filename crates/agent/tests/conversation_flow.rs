//! End-to-end conversations through `ExpenseAgent` and the dialogue core

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use expense_agent_agent::{
    DialogueStateManager, EntityResolver, ExpenseAgent, ReplyKind, TurnOutcome,
};
use expense_agent_config::AgentSettings;
use expense_agent_core::{
    CostCenter, OrgDirectory, PaymentMethod, ResolutionResult, ResponsibleHint, RoundingPolicy,
    SlotName, TransactionDraft,
};
use expense_agent_persistence::{
    ConversationStateStore, InMemoryConversationStore, InMemoryTransactionSink,
    PersistedTransaction, PersistenceError, TransactionSink,
};

fn directory() -> OrgDirectory {
    OrgDirectory::new()
        .with_cost_center("cc-felipe-silva", "Felipe Silva")
        .with_cost_center("cc-felipe-souza", "Felipe Souza")
        .with_cost_center("cc-marina", "Marina")
        .with_requester("cc-marina")
        .with_card("card-latam", "Latam")
        .with_card("card-nubank", "Nubank")
        .with_category("cat-mercado", "Supermercado")
        .with_category("cat-beleza", "Beleza")
        .with_category("cat-casa", "Casa")
        .with_category("cat-transporte", "Transporte")
        .with_category("cat-outros", "Outros")
}

fn settings() -> AgentSettings {
    AgentSettings::default()
}

struct Harness {
    agent: ExpenseAgent,
    store: Arc<InMemoryConversationStore>,
    sink: Arc<InMemoryTransactionSink>,
}

fn harness() -> Harness {
    let settings = settings();
    let store = Arc::new(InMemoryConversationStore::new(settings.dialogue.ttl()));
    let sink = Arc::new(InMemoryTransactionSink::new());
    let agent = ExpenseAgent::new(&settings, store.clone(), sink.clone()).unwrap();
    Harness { agent, store, sink }
}

/// Sink that fails until switched on
#[derive(Default)]
struct FlakySink {
    inner: InMemoryTransactionSink,
    healthy: AtomicBool,
}

#[async_trait]
impl TransactionSink for FlakySink {
    async fn persist(
        &self,
        draft: &TransactionDraft,
    ) -> Result<PersistedTransaction, PersistenceError> {
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("database offline".into()));
        }
        self.inner.persist(draft).await
    }
}

#[tokio::test]
async fn one_message_is_enough_when_everything_is_said() {
    let h = harness();
    let reply = h
        .agent
        .handle_message("5511999990000", "gastei 80 no barbeiro no pix", &directory())
        .await
        .unwrap();

    let ReplyKind::Recorded { draft, .. } = &reply.kind else {
        panic!("expected a recorded transaction, got {:?}", reply.kind);
    };
    assert_eq!(draft.amount, 80.0);
    assert_eq!(draft.description, "barbeiro");
    assert_eq!(draft.payment_method, PaymentMethod::Pix);
    assert_eq!(draft.cost_center_id(), Some("cc-marina"));
    assert_eq!(draft.category_name, "Beleza");
    assert_eq!(h.sink.len(), 1);
}

#[tokio::test]
async fn card_and_amount_without_description_asks_only_for_description() {
    let h = harness();
    let reply = h
        .agent
        .handle_message("u1", "compramos 47 reais no crédito Latam", &directory())
        .await
        .unwrap();

    let ReplyKind::Asked { clarification } = &reply.kind else {
        panic!("expected a question, got {:?}", reply.kind);
    };
    assert_eq!(clarification.missing_slots, vec![SlotName::Description]);

    let reply = h.agent.handle_message("u1", "passagem aérea", &directory()).await.unwrap();
    let ReplyKind::Recorded { draft, .. } = &reply.kind else {
        panic!("expected a recorded transaction, got {:?}", reply.kind);
    };
    assert_eq!(draft.description, "passagem aérea");
    assert!(draft.is_shared());
    assert_eq!(draft.card_id.as_deref(), Some("card-latam"));
    assert_eq!(draft.installment_count(), 1);
    assert_eq!(draft.category_name, "Transporte");
}

#[tokio::test]
async fn shared_first_name_needs_a_choice() {
    let h = harness();
    let reply = h
        .agent
        .handle_message("u1", "despesa do Felipe 60 no pix padaria", &directory())
        .await
        .unwrap();
    let ReplyKind::Asked { clarification } = &reply.kind else {
        panic!("expected a question, got {:?}", reply.kind);
    };
    assert_eq!(clarification.slot, SlotName::Responsible);
    assert_eq!(clarification.options(), ["Felipe Silva", "Felipe Souza"]);
    assert!(reply.text.contains("Felipe Silva"));

    let reply = h.agent.handle_message("u1", "Souza", &directory()).await.unwrap();
    let ReplyKind::Recorded { draft, .. } = &reply.kind else {
        panic!("expected a recorded transaction, got {:?}", reply.kind);
    };
    assert_eq!(draft.cost_center_id(), Some("cc-felipe-souza"));
}

#[test]
fn resolver_reports_both_candidates() {
    let people = vec![
        CostCenter {
            id: "1".into(),
            name: "Felipe Silva".into(),
        },
        CostCenter {
            id: "2".into(),
            name: "Felipe Souza".into(),
        },
    ];
    match EntityResolver::resolve("Felipe", &people) {
        ResolutionResult::Ambiguous { candidates } => assert_eq!(candidates.len(), 2),
        other => panic!("expected ambiguity, got {:?}", other),
    }
}

#[test]
fn verb_person_decides_the_responsible_party() {
    let manager = DialogueStateManager::new(&settings()).unwrap();
    let dir = directory();
    let now = Utc::now();

    let result = manager.process_turn("u1", "hoje gastei 50 no mercado", &dir, None, now);
    let state = result.state.expect("still collecting");
    assert_eq!(state.slots.responsible, Some(ResponsibleHint::SelfUser));
    assert_eq!(state.slots.description.as_deref(), Some("mercado"));

    let result = manager.process_turn("u2", "compramos uma tv", &dir, None, now);
    let state = result.state.expect("still collecting");
    assert_eq!(state.slots.responsible, Some(ResponsibleHint::Shared));
    assert_eq!(state.slots.description.as_deref(), Some("tv"));
}

#[test]
fn same_input_same_outcome() {
    let manager = DialogueStateManager::new(&settings()).unwrap();
    let dir = directory();
    let now = Utc::now();

    let first = manager.process_turn("u1", "paguei 120 no débito farmácia", &dir, None, now);
    let second = manager.process_turn("u1", "paguei 120 no débito farmácia", &dir, None, now);
    assert_eq!(first, second);

    let json = serde_json::to_value(&first.outcome).unwrap();
    assert_eq!(json["kind"], "draft");
}

#[tokio::test]
async fn quantity_and_installments_over_several_turns() {
    let h = harness();
    let dir = directory();

    let reply = h
        .agent
        .handle_message("u1", "compramos 2 televisões por 3000 reais parcelado", &dir)
        .await
        .unwrap();
    let ReplyKind::Asked { clarification } = &reply.kind else {
        panic!("expected a question, got {:?}", reply.kind);
    };
    assert_eq!(clarification.slot, SlotName::Card);

    let reply = h.agent.handle_message("u1", "1", &dir).await.unwrap();
    let ReplyKind::Asked { clarification } = &reply.kind else {
        panic!("expected a question, got {:?}", reply.kind);
    };
    assert_eq!(clarification.slot, SlotName::Installments);

    let reply = h.agent.handle_message("u1", "3", &dir).await.unwrap();
    let ReplyKind::Recorded { draft, .. } = &reply.kind else {
        panic!("expected a recorded transaction, got {:?}", reply.kind);
    };
    assert_eq!(draft.amount, 3000.0);
    assert_eq!(draft.description, "2 televisões");
    assert_eq!(draft.card_id.as_deref(), Some("card-latam"));
    assert_eq!(draft.installment_count(), 3);
    assert_eq!(draft.category_name, "Casa");

    let rows = &h.sink.records()[0].installment_amounts;
    assert_eq!(rows, &vec![1000.0, 1000.0, 1000.0]);
}

#[tokio::test]
async fn uneven_split_follows_the_rounding_policy() {
    let mut settings = settings();
    settings.dialogue.rounding = RoundingPolicy::LastAbsorbsRemainder;
    let store = Arc::new(InMemoryConversationStore::new(settings.dialogue.ttl()));
    let sink = Arc::new(InMemoryTransactionSink::new());
    let agent = ExpenseAgent::new(&settings, store, sink.clone()).unwrap();

    let reply = agent
        .handle_message("u1", "gastei 100 no nubank em 3x numa bolsa", &directory())
        .await
        .unwrap();
    assert!(reply.is_recorded(), "{:?}", reply.kind);

    let rows = &sink.records()[0].installment_amounts;
    assert_eq!(rows, &vec![33.33, 33.33, 33.34]);
}

#[tokio::test]
async fn reset_word_discards_the_conversation() {
    let h = harness();
    h.agent
        .handle_message("u1", "gastei 80 no barbeiro", &directory())
        .await
        .unwrap();
    assert_eq!(h.store.len(), 1);

    let reply = h.agent.handle_message("u1", "cancelar", &directory()).await.unwrap();
    assert_eq!(reply.kind, ReplyKind::Reset);
    assert!(h.store.is_empty());

    let reply = h.agent.handle_message("u1", "pix", &directory()).await.unwrap();
    assert!(matches!(reply.kind, ReplyKind::Asked { .. }));
    assert!(h.sink.is_empty());
}

#[tokio::test]
async fn expired_conversation_starts_over() {
    let h = harness();
    let dir = directory();
    let then = Utc::now() - Duration::minutes(45);

    h.agent
        .handle_message_at("u1", "gastei 80 no barbeiro", &dir, then)
        .await
        .unwrap();
    assert!(h.store.get("u1", Utc::now()).await.unwrap().is_none());

    let reply = h.agent.handle_message("u1", "pix", &dir).await.unwrap();
    assert!(matches!(reply.kind, ReplyKind::Asked { .. }));
}

#[tokio::test]
async fn failed_save_keeps_slots_for_retry() {
    let settings = settings();
    let store = Arc::new(InMemoryConversationStore::new(settings.dialogue.ttl()));
    let sink = Arc::new(FlakySink::default());
    let agent = ExpenseAgent::new(&settings, store.clone(), sink.clone()).unwrap();
    let dir = directory();

    let reply = agent
        .handle_message("u1", "gastei 80 no barbeiro no pix", &dir)
        .await
        .unwrap();
    assert_eq!(reply.kind, ReplyKind::PersistenceFailed);
    assert_eq!(reply.text, settings.prompts.responses.persistence_failure);
    assert_eq!(store.len(), 1);

    sink.healthy.store(true, Ordering::SeqCst);
    let reply = agent.handle_message("u1", "tenta de novo", &dir).await.unwrap();
    let ReplyKind::Recorded { draft, .. } = &reply.kind else {
        panic!("expected a recorded transaction, got {:?}", reply.kind);
    };
    assert_eq!(draft.description, "barbeiro");
    assert_eq!(draft.amount, 80.0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn conversations_are_isolated_per_user() {
    let h = harness();
    let dir = directory();

    h.agent.handle_message("a", "gastei 80 no barbeiro", &dir).await.unwrap();
    h.agent.handle_message("b", "compramos uma tv", &dir).await.unwrap();

    let reply = h.agent.handle_message("a", "pix", &dir).await.unwrap();
    let ReplyKind::Recorded { draft, .. } = &reply.kind else {
        panic!("expected a recorded transaction, got {:?}", reply.kind);
    };
    assert_eq!(draft.description, "barbeiro");
    assert_eq!(h.store.len(), 1);
}

#[test]
fn every_outcome_kind_serializes_with_a_tag() {
    let manager = DialogueStateManager::new(&settings()).unwrap();
    let dir = directory();
    let now = Utc::now();

    let ask = manager.process_turn("u1", "mercado", &dir, None, now);
    assert!(matches!(ask.outcome, TurnOutcome::Ask { .. }));
    let json = serde_json::to_value(&ask.outcome).unwrap();
    assert_eq!(json["kind"], "ask");
    assert_eq!(json["clarification"]["slot"], "amount");
}
