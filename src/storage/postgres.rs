use crate::models::{
    Category, CategoryUpdate, LocationCount, MusicInput, MusicTrack, NewVisit, Site, SiteGroup,
    SiteInput, VisitRecord,
};
use crate::storage::{unix_now, KvTable, Storage, StorageError, StorageResult, VisitStore};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Advisory lock key held while creating the schema
const INIT_LOCK_KEY: i64 = 0x5354_4e41_5600;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl VisitStore for PostgresStorage {
    async fn find_active_visit(
        &self,
        session_id: &str,
        active_since: i64,
    ) -> StorageResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM visitor_stats
            WHERE session_id = $1 AND last_active >= $2
            ORDER BY last_active DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(session_id)
        .bind(active_since)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(StorageError::read)
    }

    async fn insert_visit(&self, visit: &NewVisit, now: i64) -> StorageResult<VisitRecord> {
        sqlx::query_as::<_, VisitRecord>(
            r#"
            INSERT INTO visitor_stats
                (ip_address, user_agent, referrer, country, city, session_id,
                 visit_time, last_active, page_views)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1)
            RETURNING id, ip_address, user_agent, referrer, country, city, session_id,
                      visit_time, last_active, page_views
            "#,
        )
        .bind(&visit.ip_address)
        .bind(&visit.user_agent)
        .bind(&visit.referrer)
        .bind(&visit.country)
        .bind(&visit.city)
        .bind(&visit.session_id)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(StorageError::write)
    }

    async fn touch_visit(&self, id: i64, now: i64) -> StorageResult<Option<VisitRecord>> {
        sqlx::query_as::<_, VisitRecord>(
            r#"
            UPDATE visitor_stats
            SET page_views = page_views + 1,
                last_active = GREATEST(last_active, $1)
            WHERE id = $2
            RETURNING id, ip_address, user_agent, referrer, country, city, session_id,
                      visit_time, last_active, page_views
            "#,
        )
        .bind(now)
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(StorageError::write)
    }

    async fn count_visits(&self) -> StorageResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM visitor_stats")
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(StorageError::read)
    }

    async fn count_visits_between(&self, start: i64, end: i64) -> StorageResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM visitor_stats WHERE visit_time >= $1 AND visit_time < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(StorageError::read)
    }

    async fn count_active_sessions(&self, active_since: i64) -> StorageResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT session_id) FROM visitor_stats WHERE last_active >= $1",
        )
        .bind(active_since)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(StorageError::read)
    }

    async fn count_unique_sessions(&self) -> StorageResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(DISTINCT session_id) FROM visitor_stats")
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(StorageError::read)
    }

    async fn top_locations(&self, limit: i64) -> StorageResult<Vec<LocationCount>> {
        sqlx::query_as::<_, LocationCount>(
            r#"
            SELECT country, city, COUNT(*) AS count
            FROM visitor_stats
            GROUP BY country, city
            ORDER BY count DESC, country, city
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(StorageError::read)
    }

    async fn recent_visits(&self, limit: i64) -> StorageResult<Vec<VisitRecord>> {
        sqlx::query_as::<_, VisitRecord>(
            r#"
            SELECT id, ip_address, user_agent, referrer, country, city, session_id,
                   visit_time, last_active, page_views
            FROM visitor_stats
            ORDER BY last_active DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(StorageError::read)
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        // Serialize concurrent initializers; IF NOT EXISTS alone races on pg_type
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(INIT_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        // Visit records
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS visitor_stats (
                id BIGSERIAL PRIMARY KEY,
                ip_address TEXT NOT NULL,
                user_agent TEXT NOT NULL DEFAULT '',
                referrer TEXT NOT NULL DEFAULT 'direct',
                country TEXT NOT NULL DEFAULT 'unknown',
                city TEXT NOT NULL DEFAULT 'unknown',
                session_id TEXT NOT NULL,
                visit_time BIGINT NOT NULL,
                last_active BIGINT NOT NULL,
                page_views BIGINT NOT NULL DEFAULT 1 CHECK (page_views >= 1),
                CHECK (last_active >= visit_time)
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_visitor_session ON visitor_stats(session_id, last_active)",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_visitor_time ON visitor_stats(visit_time)")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_visitor_last_active ON visitor_stats(last_active)",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                display_order BIGINT NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sites (
                id BIGSERIAL PRIMARY KEY,
                category_id BIGINT NOT NULL,
                name TEXT NOT NULL,
                url TEXT NOT NULL,
                icon TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                tags TEXT NOT NULL DEFAULT '',
                group_id BIGINT,
                visit_count BIGINT NOT NULL DEFAULT 0,
                display_order BIGINT NOT NULL DEFAULT 0,
                created_at BIGINT NOT NULL,
                updated_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sites_category ON sites(category_id)")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS site_groups (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                color TEXT NOT NULL DEFAULT '',
                icon TEXT NOT NULL DEFAULT '',
                display_order BIGINT NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        for table in [KvTable::Settings, KvTable::UserPreferences] {
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS {} (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
                table.table_name()
            );
            sqlx::query(&ddl).execute(&mut *tx).await?;
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS custom_music (
                id BIGSERIAL PRIMARY KEY,
                title TEXT NOT NULL,
                artist TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL,
                cover TEXT NOT NULL DEFAULT '',
                enabled BOOLEAN NOT NULL DEFAULT TRUE,
                display_order BIGINT NOT NULL DEFAULT 0,
                created_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_categories(&self) -> StorageResult<Vec<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, kind, display_order FROM categories ORDER BY display_order, id",
        )
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(StorageError::read)
    }

    async fn create_category(&self, name: &str, kind: &str) -> StorageResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO categories (name, kind, display_order)
            SELECT $1, $2, COALESCE(MAX(display_order), 0) + 1 FROM categories
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(kind)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(StorageError::write)
    }

    async fn delete_category(&self, id: i64) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await
            .map_err(StorageError::write)?;

        Ok(result.rows_affected() > 0)
    }

    async fn reorder_categories(&self, ordered_ids: &[i64]) -> StorageResult<()> {
        let mut tx = self.pool.begin().await.map_err(StorageError::write)?;
        for (position, id) in ordered_ids.iter().enumerate() {
            sqlx::query("UPDATE categories SET display_order = $1 WHERE id = $2")
                .bind(position as i64)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::write)?;
        }
        tx.commit().await.map_err(StorageError::write)
    }

    async fn update_categories(&self, updates: &[CategoryUpdate]) -> StorageResult<()> {
        let mut tx = self.pool.begin().await.map_err(StorageError::write)?;
        for update in updates {
            sqlx::query("UPDATE categories SET kind = $1, display_order = $2 WHERE id = $3")
                .bind(&update.kind)
                .bind(update.display_order)
                .bind(update.id)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::write)?;
        }
        tx.commit().await.map_err(StorageError::write)
    }

    async fn list_sites(&self) -> StorageResult<Vec<Site>> {
        sqlx::query_as::<_, Site>(
            r#"
            SELECT id, category_id, name, url, icon, description, tags, group_id,
                   visit_count, display_order, created_at, updated_at
            FROM sites
            ORDER BY category_id, display_order, id
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(StorageError::read)
    }

    async fn frequent_sites(&self, limit: i64) -> StorageResult<Vec<Site>> {
        sqlx::query_as::<_, Site>(
            r#"
            SELECT id, category_id, name, url, icon, description, tags, group_id,
                   visit_count, display_order, created_at, updated_at
            FROM sites
            ORDER BY visit_count DESC, id
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(StorageError::read)
    }

    async fn create_site(&self, site: &SiteInput) -> StorageResult<i64> {
        let now = unix_now();
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO sites
                (category_id, name, url, icon, description, tags, group_id,
                 visit_count, display_order, created_at, updated_at)
            SELECT $1, $2, $3, $4, $5, $6, $7, 0, COALESCE(MAX(display_order), 0) + 1, $8, $9
            FROM sites WHERE category_id = $10
            RETURNING id
            "#,
        )
        .bind(site.category_id)
        .bind(site.name.trim())
        .bind(site.url.trim())
        .bind(site.icon.as_deref().unwrap_or(""))
        .bind(site.description.as_deref().unwrap_or(""))
        .bind(site.tags.as_deref().unwrap_or(""))
        .bind(site.group_id)
        .bind(now)
        .bind(now)
        .bind(site.category_id)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(StorageError::write)
    }

    async fn update_site(&self, id: i64, site: &SiteInput) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sites
            SET category_id = $1, name = $2, url = $3, icon = $4, description = $5, tags = $6,
                group_id = $7, updated_at = $8
            WHERE id = $9
            "#,
        )
        .bind(site.category_id)
        .bind(site.name.trim())
        .bind(site.url.trim())
        .bind(site.icon.as_deref().unwrap_or(""))
        .bind(site.description.as_deref().unwrap_or(""))
        .bind(site.tags.as_deref().unwrap_or(""))
        .bind(site.group_id)
        .bind(unix_now())
        .bind(id)
        .execute(self.pool.as_ref())
        .await
        .map_err(StorageError::write)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_site(&self, id: i64) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM sites WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await
            .map_err(StorageError::write)?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_site_visit(&self, id: i64) -> StorageResult<bool> {
        let result = sqlx::query(
            "UPDATE sites SET visit_count = visit_count + 1, updated_at = $1 WHERE id = $2",
        )
        .bind(unix_now())
        .bind(id)
        .execute(self.pool.as_ref())
        .await
        .map_err(StorageError::write)?;

        Ok(result.rows_affected() > 0)
    }

    async fn reorder_sites(&self, category_id: i64, ordered_ids: &[i64]) -> StorageResult<()> {
        let mut tx = self.pool.begin().await.map_err(StorageError::write)?;
        for (position, id) in ordered_ids.iter().enumerate() {
            sqlx::query("UPDATE sites SET display_order = $1 WHERE id = $2 AND category_id = $3")
                .bind(position as i64)
                .bind(id)
                .bind(category_id)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::write)?;
        }
        tx.commit().await.map_err(StorageError::write)
    }

    async fn list_site_groups(&self) -> StorageResult<Vec<SiteGroup>> {
        sqlx::query_as::<_, SiteGroup>(
            "SELECT id, name, color, icon, display_order FROM site_groups ORDER BY display_order, id",
        )
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(StorageError::read)
    }

    async fn create_site_group(&self, name: &str, color: &str, icon: &str) -> StorageResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO site_groups (name, color, icon, display_order)
            SELECT $1, $2, $3, COALESCE(MAX(display_order), 0) + 1 FROM site_groups
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(color)
        .bind(icon)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(StorageError::write)
    }

    async fn get_entries(&self, table: KvTable) -> StorageResult<BTreeMap<String, String>> {
        let query = format!("SELECT key, value FROM {}", table.table_name());
        let rows = sqlx::query_as::<_, (String, String)>(&query)
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(StorageError::read)?;

        Ok(rows.into_iter().collect())
    }

    async fn upsert_entries(
        &self,
        table: KvTable,
        entries: &BTreeMap<String, String>,
    ) -> StorageResult<()> {
        let statement = format!(
            "INSERT INTO {} (key, value) VALUES ($1, $2) ON CONFLICT (key) DO UPDATE SET value = excluded.value",
            table.table_name()
        );

        let mut tx = self.pool.begin().await.map_err(StorageError::write)?;
        for (key, value) in entries {
            sqlx::query(&statement)
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::write)?;
        }
        tx.commit().await.map_err(StorageError::write)
    }

    async fn list_music(&self) -> StorageResult<Vec<MusicTrack>> {
        sqlx::query_as::<_, MusicTrack>(
            r#"
            SELECT id, title, artist, url, cover, enabled, display_order, created_at
            FROM custom_music
            WHERE enabled
            ORDER BY display_order, created_at, id
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(StorageError::read)
    }

    async fn create_music(&self, track: &MusicInput) -> StorageResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO custom_music (title, artist, url, cover, enabled, display_order, created_at)
            SELECT $1, $2, $3, $4, $5, COALESCE(MAX(display_order), 0) + 1, $6 FROM custom_music
            RETURNING id
            "#,
        )
        .bind(track.title.trim())
        .bind(track.artist.as_deref().unwrap_or(""))
        .bind(track.url.trim())
        .bind(track.cover.as_deref().unwrap_or(""))
        .bind(track.enabled.unwrap_or(true))
        .bind(unix_now())
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(StorageError::write)
    }

    async fn update_music(&self, id: i64, track: &MusicInput) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE custom_music
            SET title = $1, artist = $2, url = $3, cover = $4, enabled = $5
            WHERE id = $6
            "#,
        )
        .bind(track.title.trim())
        .bind(track.artist.as_deref().unwrap_or(""))
        .bind(track.url.trim())
        .bind(track.cover.as_deref().unwrap_or(""))
        .bind(track.enabled.unwrap_or(true))
        .bind(id)
        .execute(self.pool.as_ref())
        .await
        .map_err(StorageError::write)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_music(&self, id: i64) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM custom_music WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await
            .map_err(StorageError::write)?;

        Ok(result.rows_affected() > 0)
    }

    async fn reorder_music(&self, ordered_ids: &[i64]) -> StorageResult<()> {
        let mut tx = self.pool.begin().await.map_err(StorageError::write)?;
        for (position, id) in ordered_ids.iter().enumerate() {
            sqlx::query("UPDATE custom_music SET display_order = $1 WHERE id = $2")
                .bind(position as i64)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::write)?;
        }
        tx.commit().await.map_err(StorageError::write)
    }
}
