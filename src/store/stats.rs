use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::store::types::Session;

/// Store statistics.
#[derive(Debug, Serialize)]
pub struct StoreStats {
    pub total_sessions: usize,
    pub total_messages: usize,
    /// Bytes of the persisted blob; 0 when nothing durable exists.
    pub storage_used_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_session: Option<DateTime<Utc>>,
}

/// Compute statistics over the session map.
pub fn collect(
    sessions: &HashMap<String, Session>,
    total_messages: usize,
    storage_used_bytes: u64,
) -> StoreStats {
    StoreStats {
        total_sessions: sessions.len(),
        total_messages,
        storage_used_bytes,
        oldest_session: sessions.values().map(|s| s.created_at).min(),
    }
}
