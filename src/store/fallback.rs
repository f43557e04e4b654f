//! Fallback engine — memory-only, substring search.
//!
//! Holds data for the current process lifetime with no persistence and no
//! embeddings. Search matches by case-insensitive substring, newest first.
//! Behaviorally compatible with the primary contract so the failover chain can
//! re-issue any call here.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::RetentionConfig;
use crate::persist::snapshot::{Snapshot, SnapshotV1};
use crate::store::engine::{ConversationStore, SearchQuery};
use crate::store::retention::{self, CleanupReport};
use crate::store::search::SearchHit;
use crate::store::stats::{self, StoreStats};
use crate::store::types::{generate_id, Message, MessageDraft, Session, SessionUpdate};
use crate::store::{find_recent_duplicate, truncate_preview, PREVIEW_MAX_CHARS};

/// Minimal in-memory conversation store.
pub struct FallbackStore {
    sessions: HashMap<String, Session>,
    arena: HashMap<String, Message>,
    order: HashMap<String, Vec<String>>,
    retention: RetentionConfig,
}

impl FallbackStore {
    pub fn new(retention: RetentionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            arena: HashMap::new(),
            order: HashMap::new(),
            retention,
        }
    }

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

    fn remove_session_cascade(&mut self, id: &str) {
        self.sessions.remove(id);
        for message_id in self.order.remove(id).unwrap_or_default() {
            self.arena.remove(&message_id);
        }
    }
}

impl Default for FallbackStore {
    fn default() -> Self {
        Self::new(RetentionConfig::default())
    }
}

#[async_trait]
impl ConversationStore for FallbackStore {
    async fn create_session(&mut self, title: Option<&str>) -> Result<Session> {
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
        Ok(session)
    }

    async fn get_session(&mut self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).cloned())
    }

    async fn all_sessions(&mut self) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(sessions)
    }

    async fn update_session(&mut self, id: &str, update: &SessionUpdate) -> Result<()> {
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
        Ok(())
    }

    async fn delete_session(&mut self, id: &str) -> Result<()> {
        if !self.sessions.contains_key(id) {
            warn!(id = %id, "delete_session on unknown session, ignoring");
            return Ok(());
        }
        self.remove_session_cascade(id);
        Ok(())
    }

    /// Unlike the primary, an unknown session id is created on the fly: when
    /// this engine answers, the primary has already failed, and refusing the
    /// message here would surface that failure to the caller.
    async fn add_message(&mut self, draft: &MessageDraft) -> Result<Message> {
        if !self.sessions.contains_key(&draft.session_id) {
            debug!(id = %draft.session_id, "adopting unknown session for degraded message");
            let now = Utc::now();
            self.sessions.insert(
                draft.session_id.clone(),
                Session {
                    id: draft.session_id.clone(),
                    title: "New Conversation".to_string(),
                    preview: String::new(),
                    created_at: now,
                    updated_at: now,
                    message_count: 0,
                },
            );
            self.order.insert(draft.session_id.clone(), Vec::new());
        }

        let now = Utc::now();
        if let Some(order) = self.order.get(&draft.session_id) {
            if let Some(existing) = find_recent_duplicate(order, &self.arena, draft, now) {
                return Ok(existing);
            }
        }

        let message = Message {
            id: generate_id("msg"),
            session_id: draft.session_id.clone(),
            role: draft.role,
            content: draft.content.clone(),
            timestamp: now,
            embedding: None,
        };
        self.arena.insert(message.id.clone(), message.clone());
        self.order
            .entry(draft.session_id.clone())
            .or_default()
            .push(message.id.clone());
        self.touch_session(&draft.session_id);
        Ok(message)
    }

    async fn messages(&mut self, session_id: &str, limit: Option<usize>) -> Result<Vec<Message>> {
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
        let Some(message) = self.arena.remove(id) else {
            warn!(id = %id, "delete_message on unknown message, ignoring");
            return Ok(());
        };
        if let Some(order) = self.order.get_mut(&message.session_id) {
            order.retain(|entry| entry != id);
        }
        self.touch_session(&message.session_id);
        Ok(())
    }

    /// Substring matching only — no ranking, newest match first. Vector
    /// queries cannot match anything here.
    async fn search_similar(
        &mut self,
        query: &SearchQuery<'_>,
        session_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let SearchQuery::Text(text) = query else {
            return Ok(Vec::new());
        };
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<SearchHit> = self
            .arena
            .values()
            .filter(|message| session_id.map_or(true, |id| message.session_id == id))
            .filter(|message| message.content.to_lowercase().contains(&needle))
            .map(|message| SearchHit {
                message: message.clone(),
                similarity: 1.0,
            })
            .collect();

        hits.sort_by(|a, b| b.message.timestamp.cmp(&a.message.timestamp));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn stats(&mut self) -> Result<StoreStats> {
        // Nothing durable exists here.
        Ok(stats::collect(&self.sessions, self.arena.len(), 0))
    }

    async fn cleanup(&mut self) -> Result<CleanupReport> {
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

        Ok(report)
    }

    async fn export(&mut self) -> Result<Snapshot> {
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

        let messages = sessions
            .iter()
            .map(|(id, _)| {
                let list = self
                    .order
                    .get(id)
                    .map(Vec::as_slice)
                    .unwrap_or(&[])
                    .iter()
                    .filter_map(|message_id| self.arena.get(message_id))
                    .cloned()
                    .collect();
                (id.clone(), list)
            })
            .collect();

        Ok(Snapshot::V1(SnapshotV1 {
            sessions,
            messages,
            embeddings: Vec::new(),
            timestamp: Utc::now(),
        }))
    }

    async fn import(&mut self, snapshot: &Snapshot) -> Result<()> {
        let payload = snapshot.payload();
        self.sessions.clear();
        self.arena.clear();
        self.order.clear();

        for (id, session) in &payload.sessions {
            self.sessions.insert(id.clone(), session.clone());
            self.order.insert(id.clone(), Vec::new());
        }
        for (session_id, messages) in &payload.messages {
            if !self.sessions.contains_key(session_id) {
                continue;
            }
            for message in messages {
                self.order
                    .entry(session_id.clone())
                    .or_default()
                    .push(message.id.clone());
                self.arena.insert(message.id.clone(), message.clone());
            }
        }
        for (id, session) in self.sessions.iter_mut() {
            session.message_count = self.order.get(id).map(Vec::len).unwrap_or(0);
        }
        Ok(())
    }
}
