//! Expense Agent
//!
//! Async turn handler around the dialogue core: loads the user's
//! conversation, runs the turn, saves finished drafts, writes the reply and
//! stores whatever state remains. Messages from the same user are handled
//! one at a time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use expense_agent_config::AgentSettings;
use expense_agent_core::{
    ClarificationRequest, CompletionService, OrgDirectory, TransactionDraft, TurnError,
};
use expense_agent_persistence::{ConversationStateStore, TransactionSink};

use crate::confirmation::ConfirmationWriter;
use crate::dst::{DialogueStateManager, TurnOutcome};
use crate::error::Result;

/// What kind of reply was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplyKind {
    Recorded {
        transaction_id: Uuid,
        draft: TransactionDraft,
    },
    Asked {
        clarification: ClarificationRequest,
    },
    Reset,
    /// The draft was complete but could not be saved; slots are kept
    PersistenceFailed,
}

/// Text to send back plus what happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub text: String,
    pub kind: ReplyKind,
}

impl AgentReply {
    pub fn is_recorded(&self) -> bool {
        matches!(self.kind, ReplyKind::Recorded { .. })
    }
}

/// Expense-recording conversational agent
pub struct ExpenseAgent {
    manager: DialogueStateManager,
    store: Arc<dyn ConversationStateStore>,
    sink: Arc<dyn TransactionSink>,
    confirmer: ConfirmationWriter,
    /// One lock per user key
    turn_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ExpenseAgent {
    pub fn new(
        settings: &AgentSettings,
        store: Arc<dyn ConversationStateStore>,
        sink: Arc<dyn TransactionSink>,
    ) -> Result<Self> {
        Ok(Self {
            manager: DialogueStateManager::new(settings)?,
            store,
            sink,
            confirmer: ConfirmationWriter::new(settings.prompts.clone(), &settings.completion),
            turn_locks: DashMap::new(),
        })
    }

    /// Phrase confirmations through a completion service
    pub fn with_completion(mut self, service: Arc<dyn CompletionService>) -> Self {
        self.confirmer = self.confirmer.with_service(service);
        self
    }

    pub fn manager(&self) -> &DialogueStateManager {
        &self.manager
    }

    /// Handle one message from `user_id`
    pub async fn handle_message(
        &self,
        user_id: &str,
        text: &str,
        directory: &OrgDirectory,
    ) -> Result<AgentReply> {
        self.handle_message_at(user_id, text, directory, Utc::now()).await
    }

    /// Same as `handle_message` with an explicit clock
    pub async fn handle_message_at(
        &self,
        user_id: &str,
        text: &str,
        directory: &OrgDirectory,
        now: DateTime<Utc>,
    ) -> Result<AgentReply> {
        let lock = self
            .turn_locks
            .entry(user_id.to_string())
            .or_default()
            .clone();
        let guard = lock.lock().await;
        let reply = self.run_turn(user_id, text, directory, now).await;
        drop(guard);

        // Only the map and this handler hold the lock: nobody is waiting
        self.turn_locks
            .remove_if(user_id, |_, held| Arc::strong_count(held) == 2);
        reply
    }

    /// Users with a turn in flight or waiting for one
    pub fn active_users(&self) -> usize {
        self.turn_locks.len()
    }

    async fn run_turn(
        &self,
        user_id: &str,
        text: &str,
        directory: &OrgDirectory,
        now: DateTime<Utc>,
    ) -> Result<AgentReply> {
        let prior = self.store.get(user_id, now).await?;
        let result = self
            .manager
            .process_turn(user_id, text, directory, prior, now);

        match result.outcome {
            TurnOutcome::Reset { message, .. } => {
                self.store.delete(user_id).await?;
                Ok(AgentReply {
                    text: message,
                    kind: ReplyKind::Reset,
                })
            }
            TurnOutcome::Ask { clarification } => {
                if let Some(state) = result.state {
                    self.store.put(state).await?;
                }
                Ok(AgentReply {
                    text: clarification.prompt_text.clone(),
                    kind: ReplyKind::Asked { clarification },
                })
            }
            TurnOutcome::Draft { draft } => match self.sink.persist(&draft).await {
                Ok(record) => {
                    self.store.delete(user_id).await?;
                    tracing::info!(user = user_id, id = %record.id, "Expense recorded");
                    Ok(AgentReply {
                        text: self.confirmer.write(&draft).await,
                        kind: ReplyKind::Recorded {
                            transaction_id: record.id,
                            draft,
                        },
                    })
                }
                Err(e) => {
                    let err = TurnError::DownstreamPersistenceFailure(e.to_string());
                    tracing::warn!(
                        user = user_id,
                        error = %err,
                        transient = e.is_transient(),
                        "Keeping conversation for retry"
                    );
                    if let Some(state) = result.finalized {
                        self.store.put(state).await?;
                    }
                    Ok(AgentReply {
                        text: self
                            .manager
                            .prompts()
                            .responses
                            .persistence_failure
                            .clone(),
                        kind: ReplyKind::PersistenceFailed,
                    })
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expense_agent_persistence::{InMemoryConversationStore, InMemoryTransactionSink};

    fn directory() -> OrgDirectory {
        OrgDirectory::new()
            .with_cost_center("cc1", "Marina")
            .with_requester("cc1")
            .with_category("cat1", "Beleza")
            .with_category("cat2", "Outros")
    }

    fn agent() -> (ExpenseAgent, Arc<InMemoryConversationStore>, Arc<InMemoryTransactionSink>) {
        let settings = AgentSettings::default();
        let store = Arc::new(InMemoryConversationStore::new(settings.dialogue.ttl()));
        let sink = Arc::new(InMemoryTransactionSink::new());
        let agent = ExpenseAgent::new(&settings, store.clone(), sink.clone()).unwrap();
        (agent, store, sink)
    }

    #[tokio::test]
    async fn test_recorded_reply_clears_state() {
        let (agent, store, sink) = agent();
        let reply = agent
            .handle_message("u1", "gastei 80 no barbeiro no pix", &directory())
            .await
            .unwrap();

        assert!(reply.is_recorded());
        assert!(reply.text.contains("barbeiro"));
        assert_eq!(sink.len(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_turn_locks_released_after_each_message() {
        let (agent, _, _) = agent();
        for user in ["u1", "u2", "u3"] {
            agent
                .handle_message(user, "gastei 80 no barbeiro", &directory())
                .await
                .unwrap();
        }
        assert_eq!(agent.active_users(), 0);
    }

    #[tokio::test]
    async fn test_question_keeps_state() {
        let (agent, store, sink) = agent();
        let reply = agent
            .handle_message("u1", "gastei 80 no barbeiro", &directory())
            .await
            .unwrap();

        assert!(matches!(reply.kind, ReplyKind::Asked { .. }));
        assert_eq!(store.len(), 1);
        assert!(sink.is_empty());

        let reply = agent.handle_message("u1", "pix", &directory()).await.unwrap();
        assert!(reply.is_recorded());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_reset_deletes_state() {
        let (agent, store, _) = agent();
        agent
            .handle_message("u1", "gastei 80 no barbeiro", &directory())
            .await
            .unwrap();
        let reply = agent.handle_message("u1", "cancela", &directory()).await.unwrap();

        assert_eq!(reply.kind, ReplyKind::Reset);
        assert!(store.is_empty());
    }
}
