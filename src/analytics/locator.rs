//! Geolocation lookup seam
//!
//! Lookups are best effort: every failure mode is a typed [`GeoError`] that
//! the visitor core turns into the `unknown` location instead of failing the
//! request.

use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::analytics::models::GeoLocation;
use crate::config::{GeoIpConfig, GeoIpProvider};

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("geolocation unavailable: {0}")]
    Unavailable(String),
    #[error("no location data for address")]
    NotFound,
    #[error("geolocation disabled")]
    Disabled,
}

#[async_trait]
pub trait GeoLocator: Send + Sync {
    async fn locate(&self, ip: IpAddr) -> Result<GeoLocation, GeoError>;
}

/// Locator used when no provider is configured
pub struct NoopLocator;

#[async_trait]
impl GeoLocator for NoopLocator {
    async fn locate(&self, _ip: IpAddr) -> Result<GeoLocation, GeoError> {
        Err(GeoError::Disabled)
    }
}

/// Look up `ip`, falling back to the `unknown` location on any failure
///
/// Addresses that do not parse (including the `unknown` sentinel) are never
/// sent to the locator.
pub async fn resolve_location(
    locator: &dyn GeoLocator,
    ip: &str,
    timeout: Duration,
) -> GeoLocation {
    let Ok(addr) = ip.parse::<IpAddr>() else {
        debug!(ip, "skipping geolocation for unparseable address");
        return GeoLocation::unknown();
    };

    match tokio::time::timeout(timeout, locator.locate(addr)).await {
        Ok(Ok(location)) => location,
        Ok(Err(GeoError::Disabled)) | Ok(Err(GeoError::NotFound)) => GeoLocation::unknown(),
        Ok(Err(e)) => {
            warn!(ip, error = %e, "geolocation lookup failed");
            GeoLocation::unknown()
        }
        Err(_) => {
            warn!(ip, timeout_ms = timeout.as_millis() as u64, "geolocation lookup timed out");
            GeoLocation::unknown()
        }
    }
}

/// Build the locator selected by configuration
pub fn build_locator(config: &GeoIpConfig) -> anyhow::Result<Arc<dyn GeoLocator>> {
    let locator: Arc<dyn GeoLocator> = match config.provider {
        GeoIpProvider::None => Arc::new(NoopLocator),
        GeoIpProvider::Mmdb => {
            let path = config
                .city_db_path
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("GeoIP City database path is not configured"))?;
            Arc::new(crate::analytics::GeoIpService::new(Some(path))?)
        }
        GeoIpProvider::Http => Arc::new(crate::analytics::HttpLocator::new(
            &config.http_endpoint,
            Duration::from_millis(config.timeout_ms),
            config.cache_max_entries,
            Duration::from_secs(config.cache_ttl_secs),
        )?),
    };

    Ok(locator)
}
