//! Integration tests for the store backends
//!
//! Tests can be filtered by database backend using the DATABASE_BACKEND environment variable:
//! - `DATABASE_BACKEND=sqlite cargo test` - Run only SQLite tests
//! - `DATABASE_BACKEND=postgres cargo test` - Run only PostgreSQL tests
//! - By default, both backends are tested
//!
//! PostgreSQL tests need `DATABASE_URL` and are skipped without it. They use
//! unique session ids so they tolerate a shared database.

use starnav::models::{MusicInput, NewVisit, SiteInput};
use starnav::storage::{KvTable, PostgresStorage, SqliteStorage, Storage, VisitStore};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Get the database backend to test from environment variable
fn should_test_backend(backend: &str) -> bool {
    match std::env::var("DATABASE_BACKEND") {
        Ok(val) => val.to_lowercase() == backend.to_lowercase(),
        Err(_) => true, // Test all backends if not specified
    }
}

/// Helper to create SQLite test storage
async fn create_sqlite_storage() -> Arc<SqliteStorage> {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

/// Helper to create PostgreSQL test storage
async fn create_postgres_storage() -> Option<Arc<PostgresStorage>> {
    let db_url = std::env::var("DATABASE_URL").ok()?;
    let storage = PostgresStorage::new(&db_url, 5).await.ok()?;
    storage.init().await.ok()?;
    Some(Arc::new(storage))
}

fn new_visit(session_id: &str, country: &str, city: &str) -> NewVisit {
    NewVisit {
        ip_address: "198.51.100.20".to_string(),
        user_agent: "integration-test".to_string(),
        referrer: "direct".to_string(),
        country: country.to_string(),
        city: city.to_string(),
        session_id: session_id.to_string(),
    }
}

fn unique_session(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

async fn check_visit_lifecycle(store: &dyn VisitStore) {
    let session = unique_session("lifecycle");
    let now = 1_710_084_600;

    assert_eq!(store.find_active_visit(&session, now - 300).await.unwrap(), None);

    let inserted = store
        .insert_visit(&new_visit(&session, "Japan", "Tokyo"), now)
        .await
        .unwrap();
    assert_eq!(inserted.page_views, 1);
    assert_eq!(inserted.visit_time, now);
    assert_eq!(inserted.last_active, now);

    let found = store.find_active_visit(&session, now - 300).await.unwrap();
    assert_eq!(found, Some(inserted.id));

    // Inclusive window edge
    let found = store.find_active_visit(&session, now).await.unwrap();
    assert_eq!(found, Some(inserted.id));
    let found = store.find_active_visit(&session, now + 1).await.unwrap();
    assert_eq!(found, None);

    let touched = store.touch_visit(inserted.id, now + 60).await.unwrap().unwrap();
    assert_eq!(touched.id, inserted.id);
    assert_eq!(touched.page_views, 2);
    assert_eq!(touched.visit_time, now);
    assert_eq!(touched.last_active, now + 60);
    assert_eq!(touched.country, "Japan");

    // An out-of-order touch still counts but never rewinds last_active
    let touched = store.touch_visit(inserted.id, now + 10).await.unwrap().unwrap();
    assert_eq!(touched.page_views, 3);
    assert_eq!(touched.last_active, now + 60);
}

async fn check_counters(store: &dyn VisitStore) {
    let now = 1_710_084_600;
    let before_total = store.count_visits().await.unwrap();
    let before_unique = store.count_unique_sessions().await.unwrap();

    let a = unique_session("count-a");
    let b = unique_session("count-b");
    store.insert_visit(&new_visit(&a, "Chile", "Santiago"), now).await.unwrap();
    store.insert_visit(&new_visit(&a, "Chile", "Santiago"), now + 600).await.unwrap();
    store.insert_visit(&new_visit(&b, "Chile", "Valparaíso"), now + 601).await.unwrap();

    assert_eq!(store.count_visits().await.unwrap(), before_total + 3);
    assert_eq!(store.count_unique_sessions().await.unwrap(), before_unique + 2);
    assert!(store.count_visits_between(now, now + 602).await.unwrap() >= 3);
    assert!(store.count_active_sessions(now + 601).await.unwrap() >= 1);

    let recent = store.recent_visits(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent[0].last_active >= recent[1].last_active);
}

#[tokio::test]
async fn test_visit_lifecycle_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = create_sqlite_storage().await;
    check_visit_lifecycle(storage.as_ref()).await;
}

#[tokio::test]
async fn test_visit_lifecycle_postgres() {
    if !should_test_backend("postgres") {
        return;
    }

    let Some(storage) = create_postgres_storage().await else {
        println!("SKIPPED: DATABASE_URL not set or unreachable");
        return;
    };
    check_visit_lifecycle(storage.as_ref()).await;
}

#[tokio::test]
async fn test_counters_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = create_sqlite_storage().await;
    check_counters(storage.as_ref()).await;

    let now = 1_710_084_600;
    assert_eq!(storage.count_visits().await.unwrap(), 3);
    assert_eq!(storage.count_visits_between(now, now + 600).await.unwrap(), 1);
    assert_eq!(storage.count_active_sessions(now + 601).await.unwrap(), 1);
    assert_eq!(storage.count_active_sessions(now + 600).await.unwrap(), 2);

    let locations = storage.top_locations(10).await.unwrap();
    assert_eq!(locations.len(), 2);
    assert_eq!(locations[0].city, "Santiago");
    assert_eq!(locations[0].count, 2);
}

#[tokio::test]
async fn test_counters_postgres() {
    if !should_test_backend("postgres") {
        return;
    }

    let Some(storage) = create_postgres_storage().await else {
        println!("SKIPPED: DATABASE_URL not set or unreachable");
        return;
    };
    check_counters(storage.as_ref()).await;
}

#[tokio::test]
async fn test_concurrent_first_visits_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    // Concurrent inserts for one session id are accepted, not rejected
    let storage = create_sqlite_storage().await;
    let mut handles = vec![];
    for _ in 0..5 {
        let storage = Arc::clone(&storage);
        handles.push(tokio::spawn(async move {
            storage
                .insert_visit(&new_visit("racer", "unknown", "unknown"), 1_710_084_600)
                .await
        }));
    }
    for handle in handles {
        let record = handle.await.unwrap().unwrap();
        assert_eq!(record.page_views, 1);
    }

    assert_eq!(storage.count_visits().await.unwrap(), 5);
    assert_eq!(storage.count_unique_sessions().await.unwrap(), 1);
}

#[tokio::test]
async fn test_catalog_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = create_sqlite_storage().await;
    let tools = storage.create_category("Tools", "links").await.unwrap();
    let news = storage.create_category("News", "links").await.unwrap();

    let site = |category_id: i64, name: &str| SiteInput {
        category_id,
        name: name.to_string(),
        url: format!("https://{name}.example"),
        ..SiteInput::default()
    };
    let a = storage.create_site(&site(tools, "a")).await.unwrap();
    let b = storage.create_site(&site(tools, "b")).await.unwrap();
    let c = storage.create_site(&site(news, "c")).await.unwrap();

    // Reordering one category leaves the other alone
    storage.reorder_sites(tools, &[b, a, c]).await.unwrap();
    let sites = storage.list_sites().await.unwrap();
    let order: Vec<i64> = sites.iter().map(|s| s.id).collect();
    assert_eq!(order, [b, a, c]);
    let c_site = sites.iter().find(|s| s.id == c).unwrap();
    assert_eq!(c_site.display_order, 1);

    assert!(storage.delete_category(news).await.unwrap());
    assert!(!storage.delete_category(news).await.unwrap());
    assert_eq!(storage.list_categories().await.unwrap().len(), 1);
}

async fn check_settings(storage: &dyn Storage) {
    let key = unique_session("setting");
    let entries = BTreeMap::from([(key.clone(), "one".to_string())]);
    storage.upsert_entries(KvTable::Settings, &entries).await.unwrap();

    let entries = BTreeMap::from([(key.clone(), "two".to_string())]);
    storage.upsert_entries(KvTable::Settings, &entries).await.unwrap();

    let settings = storage.get_entries(KvTable::Settings).await.unwrap();
    assert_eq!(settings.get(&key).map(String::as_str), Some("two"));

    let prefs = storage.get_entries(KvTable::UserPreferences).await.unwrap();
    assert!(!prefs.contains_key(&key));
}

#[tokio::test]
async fn test_settings_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = create_sqlite_storage().await;
    check_settings(storage.as_ref()).await;
}

#[tokio::test]
async fn test_settings_postgres() {
    if !should_test_backend("postgres") {
        return;
    }

    let Some(storage) = create_postgres_storage().await else {
        println!("SKIPPED: DATABASE_URL not set or unreachable");
        return;
    };
    check_settings(storage.as_ref()).await;
}

#[tokio::test]
async fn test_music_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = create_sqlite_storage().await;
    let track = MusicInput {
        title: "Theme".to_string(),
        url: "https://cdn.example/theme.mp3".to_string(),
        ..MusicInput::default()
    };
    let id = storage.create_music(&track).await.unwrap();

    let tracks = storage.list_music().await.unwrap();
    assert_eq!(tracks.len(), 1);
    assert!(tracks[0].enabled);
    assert_eq!(tracks[0].artist, "");

    let disabled = MusicInput {
        enabled: Some(false),
        ..track
    };
    assert!(storage.update_music(id, &disabled).await.unwrap());
    assert!(storage.list_music().await.unwrap().is_empty());
    assert!(!storage.update_music(id + 100, &disabled).await.unwrap());
}

#[tokio::test]
async fn test_postgres_concurrent_init() {
    if !should_test_backend("postgres") {
        return;
    }

    // Skip test if DATABASE_URL is not set
    let db_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            println!("SKIPPED: DATABASE_URL not set");
            return;
        }
    };

    let mut handles = vec![];
    for _ in 0..3 {
        let url = db_url.clone();
        handles.push(tokio::spawn(async move {
            let storage = PostgresStorage::new(&url, 2).await?;
            storage.init().await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}
