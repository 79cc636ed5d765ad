pub mod postgres;
pub mod sqlite;
pub mod trait_def;

pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;
pub use trait_def::{KvTable, Storage, StorageError, StorageResult, VisitStore};

use crate::config::{DatabaseBackend, DatabaseConfig};
use std::sync::Arc;

/// Current Unix time in seconds, used for catalog bookkeeping columns
pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Open the configured backend and hand it out through both store traits
pub async fn connect(
    config: &DatabaseConfig,
) -> anyhow::Result<(Arc<dyn Storage>, Arc<dyn VisitStore>)> {
    match config.backend {
        DatabaseBackend::Sqlite => {
            let storage = Arc::new(SqliteStorage::new(&config.url, config.max_connections).await?);
            let visits: Arc<dyn VisitStore> = storage.clone();
            Ok((storage as Arc<dyn Storage>, visits))
        }
        DatabaseBackend::Postgres => {
            let storage =
                Arc::new(PostgresStorage::new(&config.url, config.max_connections).await?);
            let visits: Arc<dyn VisitStore> = storage.clone();
            Ok((storage as Arc<dyn Storage>, visits))
        }
    }
}
