use crate::models::{
    Category, CategoryUpdate, LocationCount, MusicInput, MusicTrack, NewVisit, Site, SiteGroup,
    SiteInput, VisitRecord,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
    #[error("store write failed: {0}")]
    WriteFailed(#[source] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StorageError {
    fn is_connectivity(err: &sqlx::Error) -> bool {
        matches!(
            err,
            sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::WorkerCrashed
        )
    }

    /// Classify a failed query
    pub(crate) fn read(err: sqlx::Error) -> Self {
        if Self::is_connectivity(&err) {
            StorageError::Unavailable(err)
        } else {
            StorageError::Other(err.into())
        }
    }

    /// Classify a failed insert, update, delete or transaction
    pub(crate) fn write(err: sqlx::Error) -> Self {
        if Self::is_connectivity(&err) {
            StorageError::Unavailable(err)
        } else {
            StorageError::WriteFailed(err)
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Key-value tables sharing one layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvTable {
    Settings,
    UserPreferences,
}

impl KvTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            KvTable::Settings => "settings",
            KvTable::UserPreferences => "user_preferences",
        }
    }
}

/// Durable visit records backing session accounting
///
/// All timestamps are Unix seconds. Implementations perform each call as an
/// independent statement; nothing spans calls.
#[async_trait]
pub trait VisitStore: Send + Sync {
    /// Id of the most recently active record for `session_id` whose
    /// `last_active` is at or after `active_since`
    async fn find_active_visit(
        &self,
        session_id: &str,
        active_since: i64,
    ) -> StorageResult<Option<i64>>;

    /// Insert a record with `page_views = 1` and `visit_time = last_active = now`
    async fn insert_visit(&self, visit: &NewVisit, now: i64) -> StorageResult<VisitRecord>;

    /// Increment `page_views` and refresh `last_active`, returning the updated
    /// row or `None` if the id no longer exists
    async fn touch_visit(&self, id: i64, now: i64) -> StorageResult<Option<VisitRecord>>;

    async fn count_visits(&self) -> StorageResult<i64>;

    /// Records whose `visit_time` falls in `[start, end)`
    async fn count_visits_between(&self, start: i64, end: i64) -> StorageResult<i64>;

    /// Distinct session ids with `last_active >= active_since`
    async fn count_active_sessions(&self, active_since: i64) -> StorageResult<i64>;

    /// Distinct session ids across all records
    async fn count_unique_sessions(&self) -> StorageResult<i64>;

    async fn top_locations(&self, limit: i64) -> StorageResult<Vec<LocationCount>>;

    /// Most recently active records first
    async fn recent_visits(&self, limit: i64) -> StorageResult<Vec<VisitRecord>>;
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables and indexes)
    async fn init(&self) -> anyhow::Result<()>;

    // Categories

    async fn list_categories(&self) -> StorageResult<Vec<Category>>;

    /// Create a category at the end of the display order
    async fn create_category(&self, name: &str, kind: &str) -> StorageResult<i64>;

    async fn delete_category(&self, id: i64) -> StorageResult<bool>;

    /// Set `display_order` to each id's position in `ordered_ids`
    async fn reorder_categories(&self, ordered_ids: &[i64]) -> StorageResult<()>;

    async fn update_categories(&self, updates: &[CategoryUpdate]) -> StorageResult<()>;

    // Sites

    async fn list_sites(&self) -> StorageResult<Vec<Site>>;

    /// Sites with the highest visit counts
    async fn frequent_sites(&self, limit: i64) -> StorageResult<Vec<Site>>;

    async fn create_site(&self, site: &SiteInput) -> StorageResult<i64>;

    async fn update_site(&self, id: i64, site: &SiteInput) -> StorageResult<bool>;

    async fn delete_site(&self, id: i64) -> StorageResult<bool>;

    async fn record_site_visit(&self, id: i64) -> StorageResult<bool>;

    /// Reorder sites within one category; ids from other categories are ignored
    async fn reorder_sites(&self, category_id: i64, ordered_ids: &[i64]) -> StorageResult<()>;

    // Site groups

    async fn list_site_groups(&self) -> StorageResult<Vec<SiteGroup>>;

    async fn create_site_group(&self, name: &str, color: &str, icon: &str) -> StorageResult<i64>;

    // Settings and user preferences

    async fn get_entries(&self, table: KvTable) -> StorageResult<BTreeMap<String, String>>;

    /// Insert or replace every pair in one transaction
    async fn upsert_entries(
        &self,
        table: KvTable,
        entries: &BTreeMap<String, String>,
    ) -> StorageResult<()>;

    // Custom music

    /// Enabled tracks in display order
    async fn list_music(&self) -> StorageResult<Vec<MusicTrack>>;

    async fn create_music(&self, track: &MusicInput) -> StorageResult<i64>;

    async fn update_music(&self, id: i64, track: &MusicInput) -> StorageResult<bool>;

    async fn delete_music(&self, id: i64) -> StorageResult<bool>;

    async fn reorder_music(&self, ordered_ids: &[i64]) -> StorageResult<()>;
}
