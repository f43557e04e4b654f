//! Core conversation engine: store, search, retention, and failover.
//!
//! Two engines implement the shared [`engine::ConversationStore`] contract:
//! [`memory::MemoryStore`] (embedding-enabled, write-through persistent) and
//! [`fallback::FallbackStore`] (memory-only, substring search). The
//! [`resilient::Failover`] decorator chains them so callers never observe
//! persistence or embedding failures.

pub mod engine;
pub mod fallback;
pub mod memory;
pub mod resilient;
pub mod retention;
pub mod search;
pub mod stats;
pub mod types;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::config::MnemoConfig;
use crate::persist::KvStore;
use fallback::FallbackStore;
use memory::MemoryStore;
use resilient::Failover;
use types::{Message, MessageDraft};

/// Two messages with identical role and content inside this window are treated
/// as one (UI double-submission guard).
pub const DEDUP_WINDOW_MS: i64 = 1000;

/// Maximum characters of message content carried into a session preview.
pub const PREVIEW_MAX_CHARS: usize = 80;

/// Build the full engine chain from config: hash embeddings, durable blob
/// storage, and a memory-only fallback. Callers own the returned store and
/// pass it to collaborators explicitly.
pub fn open(config: &MnemoConfig) -> Result<Failover<MemoryStore, FallbackStore>> {
    let provider = crate::embedding::create_provider(&config.embedding)?;
    let kv = KvStore::open(config.resolved_db_path())?;
    let primary = MemoryStore::new(kv, provider, config);
    let fallback = FallbackStore::new(config.retention.clone());
    Ok(Failover::new(primary, fallback))
}

/// Truncate content to max_chars, appending "..." if truncated.
pub(crate) fn truncate_preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

/// Scan a session's messages, newest first, for a duplicate of `draft` inside
/// the dedup window. Insertion order tracks timestamps, so the scan stops at
/// the first message older than the window.
pub(crate) fn find_recent_duplicate(
    order: &[String],
    arena: &HashMap<String, Message>,
    draft: &MessageDraft,
    now: DateTime<Utc>,
) -> Option<Message> {
    for id in order.iter().rev() {
        let Some(message) = arena.get(id) else {
            continue;
        };
        if now - message.timestamp > Duration::milliseconds(DEDUP_WINDOW_MS) {
            break;
        }
        if message.role == draft.role && message.content == draft.content {
            return Some(message.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::types::Role;

    fn message(id: &str, content: &str, age_ms: i64) -> Message {
        Message {
            id: id.into(),
            session_id: "s-1".into(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now() - Duration::milliseconds(age_ms),
            embedding: None,
        }
    }

    #[test]
    fn truncate_preview_keeps_short_content() {
        assert_eq!(truncate_preview("hello", 80), "hello");
    }

    #[test]
    fn truncate_preview_cuts_long_content() {
        let long = "x".repeat(100);
        let preview = truncate_preview(&long, 80);
        assert_eq!(preview.chars().count(), 83);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn duplicate_found_inside_window() {
        let mut arena = HashMap::new();
        arena.insert("m-1".to_string(), message("m-1", "Hi", 200));
        let order = vec!["m-1".to_string()];
        let draft = MessageDraft::new("s-1", Role::User, "Hi");

        let hit = find_recent_duplicate(&order, &arena, &draft, Utc::now());
        assert_eq!(hit.unwrap().id, "m-1");
    }

    #[test]
    fn no_duplicate_outside_window() {
        let mut arena = HashMap::new();
        arena.insert("m-1".to_string(), message("m-1", "Hi", 1500));
        let order = vec!["m-1".to_string()];
        let draft = MessageDraft::new("s-1", Role::User, "Hi");

        assert!(find_recent_duplicate(&order, &arena, &draft, Utc::now()).is_none());
    }

    #[test]
    fn different_role_is_not_a_duplicate() {
        let mut arena = HashMap::new();
        arena.insert("m-1".to_string(), message("m-1", "Hi", 200));
        let order = vec!["m-1".to_string()];
        let draft = MessageDraft::new("s-1", Role::Assistant, "Hi");

        assert!(find_recent_duplicate(&order, &arena, &draft, Utc::now()).is_none());
    }
}
