//! Aggregate visitor statistics

use std::sync::Arc;

use crate::models::{LocationCount, VisitRecord, VisitStats};
use crate::storage::{StorageResult, VisitStore};

const SECONDS_PER_DAY: i64 = 86_400;

/// Start and end of the UTC calendar day containing `now`
pub fn utc_day_bounds(now: i64) -> (i64, i64) {
    let start = now - now.rem_euclid(SECONDS_PER_DAY);
    (start, start + SECONDS_PER_DAY)
}

pub struct StatsAggregator {
    store: Arc<dyn VisitStore>,
    window_secs: i64,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn VisitStore>, window_secs: i64) -> Self {
        Self { store, window_secs }
    }

    /// Counters as of `now`
    ///
    /// Each counter is its own query; they are not read in one transaction.
    pub async fn snapshot(&self, now: i64) -> StorageResult<VisitStats> {
        let (day_start, day_end) = utc_day_bounds(now);

        let total = self.store.count_visits().await?;
        let today = self.store.count_visits_between(day_start, day_end).await?;
        let online = self
            .store
            .count_active_sessions(now.saturating_sub(self.window_secs))
            .await?;
        let unique = self.store.count_unique_sessions().await?;

        Ok(VisitStats {
            total,
            today,
            online,
            unique,
        })
    }

    pub async fn locations(&self, limit: i64) -> StorageResult<Vec<LocationCount>> {
        self.store.top_locations(limit).await
    }

    pub async fn recent(&self, limit: i64) -> StorageResult<Vec<VisitRecord>> {
        self.store.recent_visits(limit).await
    }
}
