//! The shared contract both engines implement.
//!
//! The chat UI collaborator consumes exactly this surface. Methods are async:
//! they may suspend while awaiting embedding computation or persistence I/O,
//! but in-memory mutations land synchronously before any awaited write, so a
//! read issued after a write always observes it.

use anyhow::Result;
use async_trait::async_trait;

use crate::persist::snapshot::Snapshot;
use crate::store::retention::CleanupReport;
use crate::store::search::SearchHit;
use crate::store::stats::StoreStats;
use crate::store::types::{Message, MessageDraft, Session, SessionUpdate};

/// A similarity query: raw text (embedded with the store's provider) or a
/// precomputed vector.
#[derive(Debug, Clone, Copy)]
pub enum SearchQuery<'a> {
    Text(&'a str),
    Vector(&'a [f32]),
}

/// Session/message storage with semantic retrieval.
#[async_trait]
pub trait ConversationStore: Send {
    /// Create a session. `title` defaults to "New Conversation".
    async fn create_session(&mut self, title: Option<&str>) -> Result<Session>;

    async fn get_session(&mut self, id: &str) -> Result<Option<Session>>;

    /// All sessions, most recently updated first.
    async fn all_sessions(&mut self) -> Result<Vec<Session>>;

    /// Apply a partial update. A missing id is a logged no-op, not an error.
    async fn update_session(&mut self, id: &str, update: &SessionUpdate) -> Result<()>;

    /// Delete a session and cascade to its messages and their embeddings.
    /// A missing id is a logged no-op.
    async fn delete_session(&mut self, id: &str) -> Result<()>;

    /// Add a message to an existing session. Duplicate submissions (identical
    /// role and content inside the dedup window) return the existing message.
    async fn add_message(&mut self, draft: &MessageDraft) -> Result<Message>;

    /// Messages of a session in insertion order; the most recent `limit` when
    /// given. An unknown session yields an empty list.
    async fn messages(&mut self, session_id: &str, limit: Option<usize>) -> Result<Vec<Message>>;

    /// Delete one message. A missing id is a logged no-op.
    async fn delete_message(&mut self, id: &str) -> Result<()>;

    /// Rank stored messages against the query, optionally scoped to one
    /// session, best matches first.
    async fn search_similar(
        &mut self,
        query: &SearchQuery<'_>,
        session_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchHit>>;

    async fn stats(&mut self) -> Result<StoreStats>;

    /// Run the retention policy: age eviction, session cap, per-session
    /// message cap. Idempotent.
    async fn cleanup(&mut self) -> Result<CleanupReport>;

    /// Snapshot the whole store.
    async fn export(&mut self) -> Result<Snapshot>;

    /// Replace the whole store with a snapshot.
    async fn import(&mut self, snapshot: &Snapshot) -> Result<()>;
}
