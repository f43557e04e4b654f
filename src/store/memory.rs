//! Primary engine — embedding-enabled, write-through persistent.
//!
//! Messages live in a flat arena keyed by message id; a per-session index keeps
//! insertion order. Every mutation lands in memory first, then writes the full
//! snapshot through to the durable blob, so reads always observe the latest
//! state even when durability lags or fails.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::{MnemoConfig, RetentionConfig, RetrievalConfig};
use crate::embedding::EmbeddingProvider;
use crate::persist::snapshot::{Snapshot, SnapshotV1};
use crate::persist::{KvStore, SNAPSHOT_KEY};
use crate::store::engine::{ConversationStore, SearchQuery};
use crate::store::retention::{self, CleanupReport};
use crate::store::search::{rank_by_similarity, SearchHit};
use crate::store::stats::{self, StoreStats};
use crate::store::types::{generate_id, Message, MessageDraft, Session, SessionUpdate};
use crate::store::{find_recent_duplicate, truncate_preview, PREVIEW_MAX_CHARS};

/// The embedding-enabled, persistent conversation store.
pub struct MemoryStore {
    sessions: HashMap<String, Session>,
    /// Flat message arena keyed by message id.
    arena: HashMap<String, Message>,
    /// Session id → message ids in insertion order.
    order: HashMap<String, Vec<String>>,
    kv: KvStore,
    provider: Box<dyn EmbeddingProvider>,
    retrieval: RetrievalConfig,
    retention: RetentionConfig,
    loaded: bool,
}

impl MemoryStore {
    pub fn new(kv: KvStore, provider: Box<dyn EmbeddingProvider>, config: &MnemoConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            arena: HashMap::new(),
            order: HashMap::new(),
            kv,
            provider,
            retrieval: config.retrieval.clone(),
            retention: config.retention.clone(),
            loaded: false,
        }
    }

    /// Load the persisted snapshot once per process. A corrupt or missing blob
    /// starts the store empty instead of failing.
    fn ensure_loaded(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;

        let blob = match self.kv.get(SNAPSHOT_KEY) {
            Ok(blob) => blob,
            Err(error) => {
                warn!(error = %error, "could not read persisted snapshot, starting empty");
                return;
            }
        };

        let Some(json) = blob else {
            debug!("no persisted snapshot, starting empty");
            return;
        };

        match Snapshot::decode(&json) {
            Ok(snapshot) => {
                self.absorb(snapshot.payload());
                debug!(
                    sessions = self.sessions.len(),
                    messages = self.arena.len(),
                    "persisted snapshot loaded"
                );
            }
            Err(error) => {
                warn!(error = %error, "corrupt persisted snapshot, starting empty");
            }
        }
    }

    /// Write the full store through to the durable blob.
    fn persist(&self) -> Result<()> {
        let json = self.snapshot().encode()?;
        self.kv.put(SNAPSHOT_KEY, &json)
    }

    /// Build a snapshot of the current state, sessions oldest first.
    fn snapshot(&self) -> Snapshot {
        let mut sessions: Vec<(String, Session)> = self
            .sessions
            .iter()
            .map(|(id, session)| (id.clone(), session.clone()))
            .collect();
        sessions.sort_by(|a, b| {
            a.1.created_at
                .cmp(&b.1.created_at)
                .then_with(|| a.0.cmp(&b.0))
        });

        let mut messages = Vec::with_capacity(sessions.len());
        let mut embeddings = Vec::new();
        for (session_id, _) in &sessions {
            let ids = self.order.get(session_id).map(Vec::as_slice).unwrap_or(&[]);
            let mut list = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(message) = self.arena.get(id) {
                    if let Some(vector) = &message.embedding {
                        embeddings.push((id.clone(), vector.clone()));
                    }
                    list.push(message.clone());
                }
            }
            messages.push((session_id.clone(), list));
        }

        Snapshot::V1(SnapshotV1 {
            sessions,
            messages,
            embeddings,
            timestamp: Utc::now(),
        })
    }

    /// Replace the in-memory state with a snapshot payload, rejoining vectors
    /// to their messages and dropping messages whose session is gone.
    fn absorb(&mut self, payload: &SnapshotV1) {
        self.sessions.clear();
        self.arena.clear();
        self.order.clear();

        for (id, session) in &payload.sessions {
            self.sessions.insert(id.clone(), session.clone());
            self.order.insert(id.clone(), Vec::new());
        }

        let vectors: HashMap<&str, &Vec<f32>> = payload
            .embeddings
            .iter()
            .map(|(id, vector)| (id.as_str(), vector))
            .collect();

        for (session_id, messages) in &payload.messages {
            if !self.sessions.contains_key(session_id) {
                warn!(session_id = %session_id, "snapshot messages reference a missing session, dropping");
                continue;
            }
            for message in messages {
                let mut message = message.clone();
                message.embedding = vectors.get(message.id.as_str()).map(|v| (*v).clone());
                self.order
                    .entry(session_id.clone())
                    .or_default()
                    .push(message.id.clone());
                self.arena.insert(message.id.clone(), message);
            }
        }

        // Uphold the message_count invariant regardless of what was stored.
        for (id, session) in self.sessions.iter_mut() {
            session.message_count = self.order.get(id).map(Vec::len).unwrap_or(0);
        }
    }

    /// Recompute a session's derived fields after one of its messages changed.
    fn touch_session(&mut self, session_id: &str) {
        let ids = self.order.get(session_id).map(Vec::as_slice).unwrap_or(&[]);
        let message_count = ids.len();
        let preview = ids
            .last()
            .and_then(|id| self.arena.get(id))
            .map(|message| truncate_preview(&message.content, PREVIEW_MAX_CHARS))
            .unwrap_or_default();

        if let Some(session) = self.sessions.get_mut(session_id) {
            session.message_count = message_count;
            session.preview = preview;
            session.updated_at = Utc::now();
        }
    }

    /// Remove a session with its messages and embeddings. Returns the number
    /// of messages removed.
    fn remove_session_cascade(&mut self, id: &str) -> usize {
        self.sessions.remove(id);
        let ids = self.order.remove(id).unwrap_or_default();
        for message_id in &ids {
            self.arena.remove(message_id);
        }
        ids.len()
    }

    /// Verify referential integrity between sessions, the message arena, and
    /// the per-session order index. Exercised by tests after cascade paths.
    pub fn check_integrity(&self) -> Result<()> {
        for session_id in self.order.keys() {
            if !self.sessions.contains_key(session_id) {
                bail!("order index references missing session {session_id}");
            }
        }
        for (session_id, session) in &self.sessions {
            let ids = self.order.get(session_id).map(Vec::as_slice).unwrap_or(&[]);
            if session.message_count != ids.len() {
                bail!(
                    "session {session_id} message_count {} != indexed {}",
                    session.message_count,
                    ids.len()
                );
            }
            for id in ids {
                match self.arena.get(id) {
                    Some(message) if message.session_id == *session_id => {}
                    Some(_) => bail!("message {id} indexed under the wrong session"),
                    None => bail!("order index references missing message {id}"),
                }
            }
        }
        for (id, message) in &self.arena {
            let indexed = self
                .order
                .get(&message.session_id)
                .map(|ids| ids.iter().filter(|entry| *entry == id).count())
                .unwrap_or(0);
            if indexed != 1 {
                bail!("message {id} indexed {indexed} times");
            }
        }
        Ok(())
    }

    /// Raw persisted blob, for asserting write-through behavior in tests.
    #[cfg(test)]
    pub(crate) fn persisted_blob(&self, key: &str) -> Option<String> {
        self.kv.get(key).unwrap()
    }

    /// Make every subsequent persistence write fail. Test hook for failover
    /// paths.
    #[cfg(test)]
    pub(crate) fn poison_persistence(&self) {
        self.kv.poison_writes();
    }

    fn messages_in_scope(&self, session_id: Option<&str>) -> Vec<&Message> {
        let session_ids: Vec<&str> = match session_id {
            Some(id) => vec![id],
            None => {
                let mut sessions: Vec<&Session> = self.sessions.values().collect();
                sessions.sort_by(|a, b| {
                    a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
                });
                sessions.iter().map(|session| session.id.as_str()).collect()
            }
        };

        session_ids
            .into_iter()
            .filter_map(|id| self.order.get(id))
            .flatten()
            .filter_map(|id| self.arena.get(id))
            .collect()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create_session(&mut self, title: Option<&str>) -> Result<Session> {
        self.ensure_loaded();
        let now = Utc::now();
        let session = Session {
            id: generate_id("session"),
            title: title.unwrap_or("New Conversation").to_string(),
            preview: String::new(),
            created_at: now,
            updated_at: now,
            message_count: 0,
        };

        self.sessions.insert(session.id.clone(), session.clone());
        self.order.insert(session.id.clone(), Vec::new());
        self.persist()?;

        debug!(id = %session.id, title = %session.title, "session created");
        Ok(session)
    }

    async fn get_session(&mut self, id: &str) -> Result<Option<Session>> {
        self.ensure_loaded();
        Ok(self.sessions.get(id).cloned())
    }

    async fn all_sessions(&mut self) -> Result<Vec<Session>> {
        self.ensure_loaded();
        let mut sessions: Vec<Session> = self.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(sessions)
    }

    async fn update_session(&mut self, id: &str, update: &SessionUpdate) -> Result<()> {
        self.ensure_loaded();
        let Some(session) = self.sessions.get_mut(id) else {
            warn!(id = %id, "update_session on unknown session, ignoring");
            return Ok(());
        };

        if let Some(title) = &update.title {
            session.title = title.clone();
        }
        if let Some(preview) = &update.preview {
            session.preview = preview.clone();
        }
        session.updated_at = Utc::now();

        self.persist()
    }

    async fn delete_session(&mut self, id: &str) -> Result<()> {
        self.ensure_loaded();
        if !self.sessions.contains_key(id) {
            warn!(id = %id, "delete_session on unknown session, ignoring");
            return Ok(());
        }

        let removed = self.remove_session_cascade(id);
        self.persist()?;

        debug!(id = %id, messages = removed, "session deleted");
        Ok(())
    }

    async fn add_message(&mut self, draft: &MessageDraft) -> Result<Message> {
        self.ensure_loaded();
        if !self.sessions.contains_key(&draft.session_id) {
            bail!("session not found: {}", draft.session_id);
        }

        let now = Utc::now();

        // Dedup gate: a UI double-submission returns the existing message.
        if let Some(order) = self.order.get(&draft.session_id) {
            if let Some(existing) = find_recent_duplicate(order, &self.arena, draft, now) {
                debug!(id = %existing.id, "duplicate message inside dedup window, reusing");
                return Ok(existing);
            }
        }

        // Embedding is best-effort: a failed vector leaves the message
        // functional but invisible to similarity search.
        let embedding = match self.provider.embed(&draft.content) {
            Ok(vector) => Some(vector),
            Err(error) => {
                warn!(error = %error, "embedding failed, storing message without vector");
                None
            }
        };

        let message = Message {
            id: generate_id("msg"),
            session_id: draft.session_id.clone(),
            role: draft.role,
            content: draft.content.clone(),
            timestamp: now,
            embedding,
        };

        self.arena.insert(message.id.clone(), message.clone());
        self.order
            .entry(draft.session_id.clone())
            .or_default()
            .push(message.id.clone());
        self.touch_session(&draft.session_id);
        self.persist()?;

        Ok(message)
    }

    async fn messages(&mut self, session_id: &str, limit: Option<usize>) -> Result<Vec<Message>> {
        self.ensure_loaded();
        let ids = self.order.get(session_id).map(Vec::as_slice).unwrap_or(&[]);
        let skip = match limit {
            Some(limit) => ids.len().saturating_sub(limit),
            None => 0,
        };
        Ok(ids[skip..]
            .iter()
            .filter_map(|id| self.arena.get(id))
            .cloned()
            .collect())
    }

    async fn delete_message(&mut self, id: &str) -> Result<()> {
        self.ensure_loaded();
        let Some(message) = self.arena.remove(id) else {
            warn!(id = %id, "delete_message on unknown message, ignoring");
            return Ok(());
        };

        if let Some(order) = self.order.get_mut(&message.session_id) {
            order.retain(|entry| entry != id);
        }
        self.touch_session(&message.session_id);
        self.persist()
    }

    async fn search_similar(
        &mut self,
        query: &SearchQuery<'_>,
        session_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        self.ensure_loaded();
        let vector = match query {
            SearchQuery::Text(text) => self.provider.embed(text)?,
            SearchQuery::Vector(vector) => vector.to_vec(),
        };

        Ok(rank_by_similarity(
            self.messages_in_scope(session_id),
            &vector,
            self.retrieval.similarity_threshold,
            limit,
        ))
    }

    async fn stats(&mut self) -> Result<StoreStats> {
        self.ensure_loaded();
        let storage_used_bytes = self.kv.value_size(SNAPSHOT_KEY)?;
        Ok(stats::collect(
            &self.sessions,
            self.arena.len(),
            storage_used_bytes,
        ))
    }

    async fn cleanup(&mut self) -> Result<CleanupReport> {
        self.ensure_loaded();
        let now = Utc::now();
        let mut report = CleanupReport::default();

        for id in retention::expired_sessions(&self.sessions, now, self.retention.max_age_days) {
            self.remove_session_cascade(&id);
            report.expired_sessions += 1;
        }

        for id in retention::overflow_sessions(&self.sessions, self.retention.max_sessions) {
            self.remove_session_cascade(&id);
            report.overflow_sessions += 1;
        }

        let cap = self.retention.max_messages_per_session;
        let over_cap: Vec<String> = self
            .order
            .iter()
            .filter(|(_, ids)| ids.len() > cap)
            .map(|(id, _)| id.clone())
            .collect();
        for session_id in over_cap {
            let Some(order) = self.order.get_mut(&session_id) else {
                continue;
            };
            let excess: Vec<String> = order.drain(..order.len() - cap).collect();
            for message_id in &excess {
                self.arena.remove(message_id);
            }
            report.trimmed_messages += excess.len();
            self.touch_session(&session_id);
        }

        if !report.is_noop() {
            self.persist()?;
            debug!(
                expired = report.expired_sessions,
                overflow = report.overflow_sessions,
                trimmed = report.trimmed_messages,
                "retention cleanup applied"
            );
        }
        Ok(report)
    }

    async fn export(&mut self) -> Result<Snapshot> {
        self.ensure_loaded();
        Ok(self.snapshot())
    }

    async fn import(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.ensure_loaded();
        self.absorb(snapshot.payload());
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::Role;

    /// Provider that always fails, for the best-effort embedding path.
    #[derive(Debug)]
    struct BrokenProvider;

    impl EmbeddingProvider for BrokenProvider {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            bail!("no vectors today")
        }

        fn dimensions(&self) -> usize {
            128
        }
    }

    fn test_store() -> MemoryStore {
        let config = MnemoConfig::default();
        let provider = crate::embedding::create_provider(&config.embedding).unwrap();
        MemoryStore::new(KvStore::in_memory().unwrap(), provider, &config)
    }

    #[tokio::test]
    async fn add_message_attaches_unit_norm_embedding() {
        let mut store = test_store();
        let session = store.create_session(Some("Trip Planning")).await.unwrap();

        let message = store
            .add_message(&MessageDraft::new(&session.id, Role::User, "Hello there"))
            .await
            .unwrap();

        let embedding = message.embedding.expect("embedding attached");
        assert_eq!(embedding.len(), 128);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);

        let session = store.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(session.message_count, 1);
        assert_eq!(session.preview, "Hello there");
    }

    #[tokio::test]
    async fn embedding_failure_stores_message_without_vector() {
        let config = MnemoConfig::default();
        let mut store =
            MemoryStore::new(KvStore::in_memory().unwrap(), Box::new(BrokenProvider), &config);
        let session = store.create_session(None).await.unwrap();

        let message = store
            .add_message(&MessageDraft::new(&session.id, Role::User, "still stored"))
            .await
            .unwrap();
        assert!(message.embedding.is_none());

        // Stored and readable, but invisible to similarity search.
        let messages = store.messages(&session.id, None).await.unwrap();
        assert_eq!(messages.len(), 1);
        let hits = store
            .search_similar(&SearchQuery::Vector(&[0.0; 128]), None, 5)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn failed_persistence_keeps_in_memory_state() {
        let mut store = test_store();
        let session = store.create_session(None).await.unwrap();

        store.kv.poison_writes();
        let result = store
            .add_message(&MessageDraft::new(&session.id, Role::User, "survives"))
            .await;
        assert!(result.is_err(), "write-through failure surfaces as an error");

        // The in-memory mutation landed before the persistence attempt.
        let messages = store.messages(&session.id, None).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "survives");
    }

    #[tokio::test]
    async fn add_message_to_unknown_session_fails() {
        let mut store = test_store();
        let result = store
            .add_message(&MessageDraft::new("session-missing", Role::User, "hi"))
            .await;
        assert!(result.unwrap_err().to_string().contains("session not found"));
    }

    #[tokio::test]
    async fn cascade_delete_preserves_integrity() {
        let mut store = test_store();
        let keep = store.create_session(Some("keep")).await.unwrap();
        let doomed = store.create_session(Some("doomed")).await.unwrap();
        for content in ["one", "two", "three"] {
            store
                .add_message(&MessageDraft::new(&doomed.id, Role::User, content))
                .await
                .unwrap();
        }
        store
            .add_message(&MessageDraft::new(&keep.id, Role::User, "kept"))
            .await
            .unwrap();

        store.delete_session(&doomed.id).await.unwrap();

        assert!(store.get_session(&doomed.id).await.unwrap().is_none());
        assert!(store.messages(&doomed.id, None).await.unwrap().is_empty());
        assert_eq!(store.messages(&keep.id, None).await.unwrap().len(), 1);
        store.check_integrity().unwrap();
    }

    #[tokio::test]
    async fn corrupt_blob_starts_empty() {
        let config = MnemoConfig::default();
        let kv = KvStore::in_memory().unwrap();
        kv.put(SNAPSHOT_KEY, "{definitely not a snapshot").unwrap();

        let provider = crate::embedding::create_provider(&config.embedding).unwrap();
        let mut store = MemoryStore::new(kv, provider, &config);
        assert!(store.all_sessions().await.unwrap().is_empty());

        // The store stays usable after the corrupt load.
        let session = store.create_session(None).await.unwrap();
        assert!(store.get_session(&session.id).await.unwrap().is_some());
    }
}
