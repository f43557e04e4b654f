//! Age- and count-based retention policy.
//!
//! Pure selection over the session map: which sessions have outlived the
//! maximum age, and which fall past the session cap. The engines apply the
//! resulting evictions with their usual cascade semantics.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::store::types::Session;

/// What a cleanup pass removed.
#[derive(Debug, Default, Serialize)]
pub struct CleanupReport {
    /// Sessions deleted for exceeding the maximum age.
    pub expired_sessions: usize,
    /// Sessions deleted for exceeding the session cap.
    pub overflow_sessions: usize,
    /// Messages trimmed from surviving sessions past the per-session cap.
    pub trimmed_messages: usize,
}

impl CleanupReport {
    pub fn is_noop(&self) -> bool {
        self.expired_sessions == 0 && self.overflow_sessions == 0 && self.trimmed_messages == 0
    }
}

/// Sessions whose `created_at` is older than `max_age_days`.
pub fn expired_sessions(
    sessions: &HashMap<String, Session>,
    now: DateTime<Utc>,
    max_age_days: u32,
) -> Vec<String> {
    let cutoff = now - Duration::days(i64::from(max_age_days));
    sessions
        .values()
        .filter(|session| session.created_at < cutoff)
        .map(|session| session.id.clone())
        .collect()
}

/// Oldest-by-`updated_at` sessions beyond the `max_sessions` cap.
pub fn overflow_sessions(
    sessions: &HashMap<String, Session>,
    max_sessions: usize,
) -> Vec<String> {
    if sessions.len() <= max_sessions {
        return Vec::new();
    }

    let mut ordered: Vec<&Session> = sessions.values().collect();
    ordered.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then_with(|| a.id.cmp(&b.id)));
    ordered
        .iter()
        .take(sessions.len() - max_sessions)
        .map(|session| session.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str, age_days: i64, updated_days_ago: i64) -> Session {
        let now = Utc::now();
        Session {
            id: id.into(),
            title: id.into(),
            preview: String::new(),
            created_at: now - Duration::days(age_days),
            updated_at: now - Duration::days(updated_days_ago),
            message_count: 0,
        }
    }

    fn index(sessions: Vec<Session>) -> HashMap<String, Session> {
        sessions.into_iter().map(|s| (s.id.clone(), s)).collect()
    }

    #[test]
    fn expired_selects_only_sessions_past_max_age() {
        let sessions = index(vec![session("old", 40, 40), session("fresh", 5, 5)]);
        let expired = expired_sessions(&sessions, Utc::now(), 30);
        assert_eq!(expired, vec!["old".to_string()]);
    }

    #[test]
    fn expired_is_empty_when_all_sessions_are_young() {
        let sessions = index(vec![session("a", 1, 1), session("b", 29, 2)]);
        assert!(expired_sessions(&sessions, Utc::now(), 30).is_empty());
    }

    #[test]
    fn overflow_drops_oldest_updated_beyond_cap() {
        let sessions = index(vec![
            session("stale", 10, 9),
            session("older", 10, 5),
            session("recent", 10, 1),
        ]);
        let overflow = overflow_sessions(&sessions, 2);
        assert_eq!(overflow, vec!["stale".to_string()]);
    }

    #[test]
    fn overflow_is_empty_at_or_under_cap() {
        let sessions = index(vec![session("a", 1, 1), session("b", 2, 2)]);
        assert!(overflow_sessions(&sessions, 2).is_empty());
        assert!(overflow_sessions(&sessions, 10).is_empty());
    }
}
