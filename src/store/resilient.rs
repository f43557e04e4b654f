//! Primary/fallback failover decorator.
//!
//! [`Failover`] implements the store contract by trying the primary engine
//! first and, on any error, logging a warning and re-issuing the same call on
//! the fallback. One uniform wrapper covers every method, so persistence and
//! embedding failures never reach the caller — only reduced functionality
//! does (no ranking, no durability). No data migrates between the engines.

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use crate::persist::snapshot::Snapshot;
use crate::store::engine::{ConversationStore, SearchQuery};
use crate::store::retention::CleanupReport;
use crate::store::search::SearchHit;
use crate::store::stats::StoreStats;
use crate::store::types::{Message, MessageDraft, Session, SessionUpdate};

/// Store decorator that retries every failed call against a fallback engine.
pub struct Failover<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> Failover<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

/// Try the primary, log and retry on the fallback. Arguments are references or
/// `Copy`, so the retry reuses them as-is.
macro_rules! failover {
    ($self:ident . $method:ident ( $($arg:expr),* )) => {
        match $self.primary.$method($($arg),*).await {
            Ok(value) => Ok(value),
            Err(error) => {
                warn!(
                    op = stringify!($method),
                    error = %error,
                    "primary store failed, retrying on fallback"
                );
                $self.fallback.$method($($arg),*).await
            }
        }
    };
}

#[async_trait]
impl<P, F> ConversationStore for Failover<P, F>
where
    P: ConversationStore + Send,
    F: ConversationStore + Send,
{
    async fn create_session(&mut self, title: Option<&str>) -> Result<Session> {
        failover!(self.create_session(title))
    }

    async fn get_session(&mut self, id: &str) -> Result<Option<Session>> {
        failover!(self.get_session(id))
    }

    async fn all_sessions(&mut self) -> Result<Vec<Session>> {
        failover!(self.all_sessions())
    }

    async fn update_session(&mut self, id: &str, update: &SessionUpdate) -> Result<()> {
        failover!(self.update_session(id, update))
    }

    async fn delete_session(&mut self, id: &str) -> Result<()> {
        failover!(self.delete_session(id))
    }

    async fn add_message(&mut self, draft: &MessageDraft) -> Result<Message> {
        failover!(self.add_message(draft))
    }

    async fn messages(&mut self, session_id: &str, limit: Option<usize>) -> Result<Vec<Message>> {
        failover!(self.messages(session_id, limit))
    }

    async fn delete_message(&mut self, id: &str) -> Result<()> {
        failover!(self.delete_message(id))
    }

    async fn search_similar(
        &mut self,
        query: &SearchQuery<'_>,
        session_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        failover!(self.search_similar(query, session_id, limit))
    }

    async fn stats(&mut self) -> Result<StoreStats> {
        failover!(self.stats())
    }

    async fn cleanup(&mut self) -> Result<CleanupReport> {
        failover!(self.cleanup())
    }

    async fn export(&mut self) -> Result<Snapshot> {
        failover!(self.export())
    }

    async fn import(&mut self, snapshot: &Snapshot) -> Result<()> {
        failover!(self.import(snapshot))
    }
}
