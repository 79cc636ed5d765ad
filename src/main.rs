use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use starnav::analytics::build_locator;
use starnav::api::{self, AppState};
use starnav::auth::AdminAuth;
use starnav::config::{Config, GeoIpProvider};
use starnav::storage;
use starnav::visitors::{SystemClock, VisitTracker};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("starnav=info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    info!(
        backend = config.database.backend.as_str(),
        "Opening database: {}", config.database.url
    );
    let (storage, visits) = storage::connect(&config.database)
        .await
        .context("failed to open the database")?;

    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    // Geolocation
    let locator = build_locator(&config.geoip).context("failed to set up geolocation")?;
    match config.geoip.provider {
        GeoIpProvider::None => info!("🌍 Geolocation disabled, visits are recorded as 'unknown'"),
        GeoIpProvider::Mmdb => info!(
            "🌍 Geolocation from MaxMind database: {}",
            config.geoip.city_db_path.as_deref().unwrap_or_default()
        ),
        GeoIpProvider::Http => info!(
            "🌍 Geolocation via {} (timeout {}ms)",
            config.geoip.http_endpoint, config.geoip.timeout_ms
        ),
    }

    let tracker = Arc::new(VisitTracker::new(
        visits,
        locator,
        Arc::new(SystemClock),
        &config.visitors,
        Duration::from_millis(config.geoip.timeout_ms),
    ));
    info!(
        window_secs = config.visitors.session_window_secs,
        ip_anonymization = config.visitors.ip_anonymization,
        "Visitor tracking ready"
    );

    let auth = Arc::new(AdminAuth::new(config.auth.admin_token.clone()));
    if auth.is_enabled() {
        info!("🔐 Admin token required for write routes");
    } else {
        info!("🔓 ADMIN_TOKEN not set - all API requests are allowed");
    }

    let state = Arc::new(AppState {
        storage,
        tracker,
        backend: config.database.backend,
        recent_limit: config.visitors.recent_visits_limit,
    });

    if let Some(ref static_dir) = config.frontend.static_dir {
        info!("🎨 Serving frontend from directory: {}", static_dir);
    } else {
        info!("🎨 Serving embedded frontend");
    }

    let app = api::create_app(state, auth, &config.frontend);

    let addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("🚀 Server listening on http://{}", addr);
    info!("   - API endpoints available at http://{}/api/...", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
