#![allow(dead_code)]

use chrono::{Duration, Utc};
use mnemo::config::MnemoConfig;
use mnemo::persist::snapshot::{Snapshot, SnapshotV1};
use mnemo::persist::KvStore;
use mnemo::store::fallback::FallbackStore;
use mnemo::store::memory::MemoryStore;
use mnemo::store::resilient::Failover;
use mnemo::store::types::{Message, Role, Session};
use std::path::Path;

/// Default config; tweak retention/retrieval fields per test as needed.
pub fn test_config() -> MnemoConfig {
    MnemoConfig::default()
}

/// Fresh primary store over an in-memory blob.
pub fn memory_store() -> MemoryStore {
    memory_store_with(&test_config())
}

pub fn memory_store_with(config: &MnemoConfig) -> MemoryStore {
    let provider = mnemo::embedding::create_provider(&config.embedding).unwrap();
    MemoryStore::new(KvStore::in_memory().unwrap(), provider, config)
}

/// Primary store over a file-backed blob, for reopen tests.
pub fn memory_store_at(path: &Path) -> MemoryStore {
    let config = test_config();
    let provider = mnemo::embedding::create_provider(&config.embedding).unwrap();
    MemoryStore::new(KvStore::open(path).unwrap(), provider, &config)
}

/// Full failover chain over an in-memory blob.
pub fn chain() -> Failover<MemoryStore, FallbackStore> {
    Failover::new(memory_store(), FallbackStore::default())
}

/// A session backdated by whole days, for retention tests.
pub fn backdated_session(id: &str, created_days_ago: i64, updated_days_ago: i64) -> Session {
    let now = Utc::now();
    Session {
        id: id.into(),
        title: format!("session {id}"),
        preview: String::new(),
        created_at: now - Duration::days(created_days_ago),
        updated_at: now - Duration::days(updated_days_ago),
        message_count: 0,
    }
}

/// A message backdated by whole days.
pub fn backdated_message(id: &str, session_id: &str, content: &str, days_ago: i64) -> Message {
    Message {
        id: id.into(),
        session_id: session_id.into(),
        role: Role::User,
        content: content.into(),
        timestamp: Utc::now() - Duration::days(days_ago),
        embedding: None,
    }
}

/// Assemble a version-1 snapshot from sessions and their messages.
pub fn snapshot_of(entries: Vec<(Session, Vec<Message>)>) -> Snapshot {
    let sessions = entries
        .iter()
        .map(|(session, _)| (session.id.clone(), session.clone()))
        .collect();
    let messages = entries
        .iter()
        .map(|(session, messages)| (session.id.clone(), messages.clone()))
        .collect();
    Snapshot::V1(SnapshotV1 {
        sessions,
        messages,
        embeddings: Vec::new(),
        timestamp: Utc::now(),
    })
}
