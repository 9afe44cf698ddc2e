//! Conversation state storage
//!
//! One `ConversationState` per user key, dropped after a period of
//! inactivity. Writes are last-writer-wins per key.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use expense_agent_core::ConversationState;

use crate::error::PersistenceError;

/// Storage for in-flight conversations
#[async_trait]
pub trait ConversationStateStore: Send + Sync {
    /// Load a live conversation; expired ones are dropped and read as absent
    async fn get(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ConversationState>, PersistenceError>;

    /// Store a conversation under its `conversation_id`
    async fn put(&self, state: ConversationState) -> Result<(), PersistenceError>;

    /// Forget a conversation
    async fn delete(&self, key: &str) -> Result<(), PersistenceError>;
}

/// In-memory store with inactivity expiry
pub struct InMemoryConversationStore {
    entries: DashMap<String, ConversationState>,
    ttl: Duration,
}

impl InMemoryConversationStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired conversation; returns how many were removed
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, state| !state.is_expired(now, self.ttl));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(removed, "Purged expired conversations");
        }
        removed
    }
}

#[async_trait]
impl ConversationStateStore for InMemoryConversationStore {
    async fn get(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ConversationState>, PersistenceError> {
        if self
            .entries
            .remove_if(key, |_, state| state.is_expired(now, self.ttl))
            .is_some()
        {
            tracing::debug!(conversation = key, "Conversation expired");
            return Ok(None);
        }
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, state: ConversationState) -> Result<(), PersistenceError> {
        self.entries.insert(state.conversation_id.clone(), state);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), PersistenceError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expense_agent_core::Turn;

    fn state(key: &str, at: DateTime<Utc>) -> ConversationState {
        let mut state = ConversationState::new(key, at);
        state.push_turn(Turn::user("gastei 50"), 10);
        state
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = InMemoryConversationStore::new(Duration::minutes(30));
        let now = Utc::now();

        store.put(state("u1", now)).await.unwrap();
        let loaded = store.get("u1", now).await.unwrap();
        assert_eq!(loaded.map(|s| s.turns.len()), Some(1));

        store.delete("u1").await.unwrap();
        assert!(store.get("u1", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_conversation_is_dropped() {
        let store = InMemoryConversationStore::new(Duration::minutes(30));
        let now = Utc::now();

        store.put(state("u1", now - Duration::minutes(45))).await.unwrap();
        assert!(store.get("u1", now).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let store = InMemoryConversationStore::new(Duration::minutes(30));
        let now = Utc::now();

        store.put(state("u1", now)).await.unwrap();
        let mut newer = ConversationState::new("u1", now);
        newer.push_turn(Turn::user("a"), 10);
        newer.push_turn(Turn::assistant("b"), 10);
        store.put(newer).await.unwrap();

        let loaded = store.get("u1", now).await.unwrap().unwrap();
        assert_eq!(loaded.turns.len(), 2);
    }

    #[test]
    fn test_purge_expired() {
        let store = InMemoryConversationStore::new(Duration::minutes(30));
        let now = Utc::now();
        store.entries.insert("old".into(), state("old", now - Duration::hours(2)));
        store.entries.insert("new".into(), state("new", now));

        assert_eq!(store.purge_expired(now), 1);
        assert_eq!(store.len(), 1);
    }
}
