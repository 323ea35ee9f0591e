//! Per-tenant, per-collection conversation history.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::document::ConversationTurn;
use crate::error::Result;

/// Identifies one conversation: a tenant talking to one of its collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub tenant_id: String,
    pub collection_id: String,
}

impl ConversationKey {
    pub fn new(tenant_id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self { tenant_id: tenant_id.into(), collection_id: collection_id.into() }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.collection_id)
    }
}

/// Storage for conversation turns keyed by [`ConversationKey`].
///
/// Implementations must serialize appends per key: concurrent appends to
/// the same key are never lost or reordered relative to each other.
/// Different keys are independent.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Return the turns for `key`, oldest first.
    ///
    /// An unknown key yields an empty history, not an error.
    async fn history(&self, key: &ConversationKey) -> Result<Vec<ConversationTurn>>;

    /// Append one turn to the end of the history for `key`.
    async fn append(&self, key: &ConversationKey, turn: ConversationTurn) -> Result<()>;

    /// Drop all turns for `key`.
    async fn clear(&self, key: &ConversationKey) -> Result<()>;

    /// Number of turns stored for `key`.
    async fn len(&self, key: &ConversationKey) -> Result<usize> {
        Ok(self.history(key).await?.len())
    }
}

type Turns = Arc<Mutex<VecDeque<ConversationTurn>>>;

/// An in-process [`ConversationStore`].
///
/// Entries are created lazily on first access and live for the lifetime of
/// the store; nothing is persisted. By default history grows without bound.
/// [`with_max_turns`](Self::with_max_turns) keeps only the most recent turns.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<ConversationKey, Turns>>,
    max_turns: Option<NonZeroUsize>,
}

impl InMemoryConversationStore {
    /// Create a store with unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that retains at most `max_turns` turns per key.
    pub fn with_max_turns(max_turns: NonZeroUsize) -> Self {
        Self { conversations: RwLock::default(), max_turns: Some(max_turns) }
    }

    pub fn max_turns(&self) -> Option<usize> {
        self.max_turns.map(NonZeroUsize::get)
    }

    /// Number of conversations created so far.
    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }

    async fn entry(&self, key: &ConversationKey) -> Turns {
        if let Some(turns) = self.conversations.read().await.get(key) {
            return Arc::clone(turns);
        }
        let mut conversations = self.conversations.write().await;
        Arc::clone(conversations.entry(key.clone()).or_insert_with(|| {
            debug!(conversation = %key, "created conversation");
            Turns::default()
        }))
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn history(&self, key: &ConversationKey) -> Result<Vec<ConversationTurn>> {
        let turns = self.entry(key).await;
        let turns = turns.lock().await;
        Ok(turns.iter().cloned().collect())
    }

    async fn append(&self, key: &ConversationKey, turn: ConversationTurn) -> Result<()> {
        let turns = self.entry(key).await;
        let mut turns = turns.lock().await;
        turns.push_back(turn);
        if let Some(max) = self.max_turns.map(NonZeroUsize::get) {
            while turns.len() > max {
                turns.pop_front();
            }
        }
        debug!(conversation = %key, turn_count = turns.len(), "appended turn");
        Ok(())
    }

    async fn clear(&self, key: &ConversationKey) -> Result<()> {
        let turns = self.entry(key).await;
        turns.lock().await.clear();
        Ok(())
    }

    async fn len(&self, key: &ConversationKey) -> Result<usize> {
        let turns = self.entry(key).await;
        let len = turns.lock().await.len();
        Ok(len)
    }
}
