//! Versioned snapshot schema for export, import, and the persisted blob.
//!
//! One JSON shape serves all three: the write-through blob, `export`, and
//! `import`. The payload carries an explicit schema version tag; unknown
//! versions are rejected on decode rather than trusted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::types::{Message, Session};

/// Snapshot decode failures, distinguished so the load path can log the cause.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("unsupported snapshot version: {0}")]
    UnsupportedVersion(String),
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A complete, versioned copy of the store.
///
/// Serialized form (version 1):
/// `{"version":"1","sessions":[[id,Session],..],"messages":[[sessionId,[Message,..]],..],
///   "embeddings":[[messageId,[f32,..]],..],"timestamp":"..."}`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "version")]
pub enum Snapshot {
    #[serde(rename = "1")]
    V1(SnapshotV1),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotV1 {
    /// `[session_id, session]` pairs, oldest first.
    pub sessions: Vec<(String, Session)>,
    /// `[session_id, messages]` pairs; messages in insertion order.
    pub messages: Vec<(String, Vec<Message>)>,
    /// `[message_id, vector]` pairs for every message that has an embedding.
    pub embeddings: Vec<(String, Vec<f32>)>,
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

impl Snapshot {
    /// Serialize to the JSON blob form.
    pub fn encode(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON, rejecting unknown schema versions explicitly.
    pub fn decode(json: &str) -> Result<Self, SnapshotError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let version = value
            .get("version")
            .and_then(|v| v.as_str())
            .unwrap_or("missing")
            .to_string();
        match version.as_str() {
            "1" => Ok(Snapshot::V1(serde_json::from_value(value)?)),
            _ => Err(SnapshotError::UnsupportedVersion(version)),
        }
    }

    /// Access the (single, for now) versioned payload.
    pub fn payload(&self) -> &SnapshotV1 {
        match self {
            Snapshot::V1(payload) => payload,
        }
    }
}
