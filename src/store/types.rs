//! Core conversation type definitions.
//!
//! Defines [`Role`] (who authored a message), [`Session`] (a named, ordered
//! container of messages), [`Message`], the [`MessageDraft`] input for new
//! messages, and the explicit [`SessionUpdate`] carrier for partial updates.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// One conversation: a named, ordered container of messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Generated, collision-resistant id (see [`generate_id`]).
    pub id: String,
    pub title: String,
    /// Content of the most recent message, truncated for list views.
    pub preview: String,
    pub created_at: DateTime<Utc>,
    /// Advances on every mutation of the session or any of its messages.
    pub updated_at: DateTime<Utc>,
    /// Always equals the live count of messages owned by this session.
    pub message_count: usize,
}

/// One message inside a session.
///
/// The embedding is held in memory only; the snapshot schema serializes vectors
/// separately, keyed by message id, so it is skipped here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

/// Input for a new message. The store generates id, timestamp, and embedding.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub session_id: String,
    pub role: Role,
    pub content: String,
}

impl MessageDraft {
    pub fn new(session_id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            role,
            content: content.into(),
        }
    }
}

/// Fields of a session that callers may change. Unset fields are left as-is.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub title: Option<String>,
    pub preview: Option<String>,
}

impl SessionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = Some(preview.into());
        self
    }
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a collision-resistant id without a central sequencer.
///
/// Combines wall-clock millis, a process-monotonic counter (rapid sequential
/// inserts land on the same millisecond), and a random suffix.
pub fn generate_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{millis}-{seq}-{}", &random[..8])
}
