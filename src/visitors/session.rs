//! Session continuation decisions

use std::sync::Arc;
use tracing::debug;

use crate::storage::{StorageResult, VisitStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionDecision {
    /// Touch the record with this id
    Continue(i64),
    /// Create a new record
    Start,
}

/// Decides whether a visit continues an active session
///
/// Only the session id and recency are matched; the client address is not,
/// so a session survives network changes without being counted twice.
pub struct SessionResolver {
    store: Arc<dyn VisitStore>,
    window_secs: i64,
}

impl SessionResolver {
    pub fn new(store: Arc<dyn VisitStore>, window_secs: i64) -> Self {
        Self { store, window_secs }
    }

    /// Oldest `last_active` still inside the session window at `now`
    pub fn active_since(&self, now: i64) -> i64 {
        now.saturating_sub(self.window_secs)
    }

    pub async fn resolve(
        &self,
        ip: &str,
        session_id: &str,
        now: i64,
    ) -> StorageResult<SessionDecision> {
        let decision = match self
            .store
            .find_active_visit(session_id, self.active_since(now))
            .await?
        {
            Some(id) => SessionDecision::Continue(id),
            None => SessionDecision::Start,
        };

        debug!(session_id, ip, ?decision, "resolved visit session");
        Ok(decision)
    }
}
