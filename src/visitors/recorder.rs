//! Applies session decisions to the store

use std::sync::Arc;
use tracing::debug;

use crate::models::{NewVisit, VisitRecord};
use crate::storage::{StorageResult, VisitStore};

pub struct VisitRecorder {
    store: Arc<dyn VisitStore>,
}

impl VisitRecorder {
    pub fn new(store: Arc<dyn VisitStore>) -> Self {
        Self { store }
    }

    /// Increment `page_views` and refresh `last_active` of record `id`
    ///
    /// `visit_time` is left untouched. Returns `None` if the record has
    /// disappeared since it was resolved; the caller then starts a new
    /// session. Store errors are returned as-is; nothing is retried.
    pub async fn continue_session(
        &self,
        id: i64,
        now: i64,
    ) -> StorageResult<Option<VisitRecord>> {
        let touched = self.store.touch_visit(id, now).await?;
        if touched.is_none() {
            debug!(id, "visit record vanished before touch");
        }
        Ok(touched)
    }

    /// Insert a fresh record with one page view
    pub async fn start_session(&self, visit: &NewVisit, now: i64) -> StorageResult<VisitRecord> {
        self.store.insert_visit(visit, now).await
    }
}
