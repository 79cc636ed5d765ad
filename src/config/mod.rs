use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub visitors: VisitorConfig,
    pub geoip: GeoIpConfig,
    pub auth: AuthConfig,
    pub frontend: FrontendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

impl DatabaseBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseBackend::Sqlite => "sqlite",
            DatabaseBackend::Postgres => "postgres",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Session accounting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorConfig {
    /// Inactivity after which a session no longer counts as active (seconds)
    pub session_window_secs: i64,

    /// Number of recent visits returned by the stats endpoint
    pub recent_visits_limit: i64,

    /// Store truncated network prefixes instead of full client addresses
    pub ip_anonymization: bool,
}

impl Default for VisitorConfig {
    fn default() -> Self {
        Self {
            session_window_secs: Self::DEFAULT_SESSION_WINDOW_SECS,
            recent_visits_limit: Self::DEFAULT_RECENT_LIMIT,
            ip_anonymization: false,
        }
    }
}

impl VisitorConfig {
    pub const DEFAULT_SESSION_WINDOW_SECS: i64 = 300;
    /// One year
    pub const MAX_SESSION_WINDOW_SECS: i64 = 86_400 * 365;
    pub const DEFAULT_RECENT_LIMIT: i64 = 20;
    pub const MAX_RECENT_LIMIT: i64 = 50;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoIpProvider {
    None,
    Mmdb,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIpConfig {
    pub provider: GeoIpProvider,
    /// Path to a MaxMind GeoLite2-City / GeoIP2-City database
    #[serde(default)]
    pub city_db_path: Option<String>,
    /// Base URL of an ipapi.co compatible lookup service
    pub http_endpoint: String,
    pub timeout_ms: u64,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: u64,
}

impl Default for GeoIpConfig {
    fn default() -> Self {
        Self {
            provider: GeoIpProvider::None,
            city_db_path: None,
            http_endpoint: "https://ipapi.co".to_string(),
            timeout_ms: 1500,
            cache_ttl_secs: 3600,
            cache_max_entries: 10_000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret for mutating admin routes; `None` disables the check
    #[serde(default)]
    pub admin_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Path to directory containing static frontend files
    /// If None, uses embedded frontend
    pub static_dir: Option<String>,
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn validate_session_window(secs: i64) -> anyhow::Result<i64> {
    if !(1..=VisitorConfig::MAX_SESSION_WINDOW_SECS).contains(&secs) {
        anyhow::bail!(
            "SESSION_WINDOW_SECS must be between 1 and {}, got {secs}",
            VisitorConfig::MAX_SESSION_WINDOW_SECS
        );
    }
    Ok(secs)
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            "sqlite" => DatabaseBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres"
                );
                DatabaseBackend::Sqlite
            }
        };

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./starnav.db".to_string());
        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", 10u32)?;

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = env_or("API_PORT", 8080u16)?;

        let session_window_secs = validate_session_window(env_or(
            "SESSION_WINDOW_SECS",
            VisitorConfig::DEFAULT_SESSION_WINDOW_SECS,
        )?)?;
        let recent_visits_limit =
            env_or("RECENT_VISITS_LIMIT", VisitorConfig::DEFAULT_RECENT_LIMIT)?
                .clamp(1, VisitorConfig::MAX_RECENT_LIMIT);

        let geo_defaults = GeoIpConfig::default();
        let provider = match std::env::var("GEOIP_PROVIDER")
            .unwrap_or_else(|_| "none".to_string())
            .to_lowercase()
            .as_str()
        {
            "none" => GeoIpProvider::None,
            "mmdb" => GeoIpProvider::Mmdb,
            "http" => GeoIpProvider::Http,
            other => {
                tracing::warn!(
                    "Unknown GEOIP_PROVIDER '{other}', falling back to 'none'. Supported values: none, mmdb, http"
                );
                GeoIpProvider::None
            }
        };

        let city_db_path = std::env::var("GEOIP_CITY_DB_PATH").ok();
        if provider == GeoIpProvider::Mmdb && city_db_path.is_none() {
            anyhow::bail!("GEOIP_CITY_DB_PATH must be set when GEOIP_PROVIDER=mmdb");
        }

        let admin_token = std::env::var("ADMIN_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let frontend_static_dir = std::env::var("FRONTEND_STATIC_DIR").ok();

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            visitors: VisitorConfig {
                session_window_secs,
                recent_visits_limit,
                ip_anonymization: env_flag("IP_ANONYMIZATION"),
            },
            geoip: GeoIpConfig {
                provider,
                city_db_path,
                http_endpoint: std::env::var("GEOIP_HTTP_ENDPOINT")
                    .unwrap_or(geo_defaults.http_endpoint),
                timeout_ms: env_or("GEOIP_TIMEOUT_MS", geo_defaults.timeout_ms)?,
                cache_ttl_secs: env_or("GEOIP_CACHE_TTL_SECS", geo_defaults.cache_ttl_secs)?,
                cache_max_entries: env_or(
                    "GEOIP_CACHE_MAX_ENTRIES",
                    geo_defaults.cache_max_entries,
                )?,
            },
            auth: AuthConfig { admin_token },
            frontend: FrontendConfig {
                static_dir: frontend_static_dir,
            },
        })
    }
}
