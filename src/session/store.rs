use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::models::Session;

/// Durable, append-only log of finished sessions.
pub trait SessionStore: Send + Sync + 'static {
    fn record_session(&self, session: &Session) -> impl Future<Output = Result<()>> + Send;

    /// Sessions started after `cutoff`, most recent first.
    fn sessions_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Session>>> + Send;
}

impl SessionStore for Database {
    async fn record_session(&self, session: &Session) -> Result<()> {
        self.insert_session(session).await
    }

    async fn sessions_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Session>> {
        self.list_sessions_since(cutoff).await
    }
}
