//! Geolocation through an ipapi.co compatible HTTP service
//!
//! Successful answers are cached per address so repeat visitors do not cost
//! an outbound request.

use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

use crate::analytics::locator::{GeoError, GeoLocator};
use crate::analytics::models::GeoLocation;

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    #[serde(default)]
    country_name: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    error: bool,
    #[serde(default)]
    reason: Option<String>,
}

pub struct HttpLocator {
    endpoint: String,
    client: Client,
    cache: Cache<IpAddr, GeoLocation>,
}

impl HttpLocator {
    pub fn new(
        endpoint: &str,
        timeout: Duration,
        cache_max_entries: u64,
        cache_ttl: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("starnav/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for geolocation")?;

        let cache = Cache::builder()
            .max_capacity(cache_max_entries)
            .time_to_live(cache_ttl)
            .build();

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
            cache,
        })
    }

    fn lookup_url(&self, ip: IpAddr) -> String {
        format!("{}/{}/json/", self.endpoint, ip)
    }

    async fn fetch(&self, ip: IpAddr) -> Result<GeoLocation, GeoError> {
        let response = self
            .client
            .get(self.lookup_url(ip))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| GeoError::Unavailable(e.to_string()))?;

        let body: IpApiResponse = response
            .json()
            .await
            .map_err(|e| GeoError::Unavailable(format!("malformed lookup response: {e}")))?;

        if body.error {
            debug!(
                %ip,
                reason = body.reason.as_deref().unwrap_or(""),
                "lookup service rejected address"
            );
            return Err(GeoError::NotFound);
        }

        let location = GeoLocation::from_parts(body.country_name.as_deref(), body.city.as_deref());
        if location.is_unknown() {
            return Err(GeoError::NotFound);
        }
        Ok(location)
    }
}

/// Addresses no public lookup service can place
fn is_non_routable(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
        }
        IpAddr::V6(v6) => {
            v6.is_loopback() || v6.is_unspecified() || (v6.segments()[0] & 0xfe00) == 0xfc00
        }
    }
}

#[async_trait]
impl GeoLocator for HttpLocator {
    async fn locate(&self, ip: IpAddr) -> Result<GeoLocation, GeoError> {
        if is_non_routable(ip) {
            return Err(GeoError::NotFound);
        }

        if let Some(hit) = self.cache.get(&ip).await {
            return Ok(hit);
        }

        let location = self.fetch(ip).await?;
        self.cache.insert(ip, location.clone()).await;
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(endpoint: &str) -> HttpLocator {
        HttpLocator::new(
            endpoint,
            Duration::from_millis(200),
            100,
            Duration::from_secs(60),
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_url_trims_trailing_slash() {
        let locator = locator("https://ipapi.co/");
        assert_eq!(
            locator.lookup_url("8.8.8.8".parse().unwrap()),
            "https://ipapi.co/8.8.8.8/json/"
        );
    }

    #[test]
    fn test_non_routable_addresses() {
        assert!(is_non_routable("10.0.0.1".parse().unwrap()));
        assert!(is_non_routable("127.0.0.1".parse().unwrap()));
        assert!(is_non_routable("::1".parse().unwrap()));
        assert!(is_non_routable("fd00::1".parse().unwrap()));
        assert!(!is_non_routable("8.8.8.8".parse().unwrap()));
        assert!(!is_non_routable("2001:4860::8888".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_private_address_is_not_fetched() {
        // Nothing listens here; a request would surface as Unavailable
        let locator = locator("http://127.0.0.1:9");
        let result = locator.locate("192.168.1.20".parse().unwrap()).await;
        assert!(matches!(result, Err(GeoError::NotFound)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let locator = locator("http://127.0.0.1:9");
        let result = locator.locate("8.8.8.8".parse().unwrap()).await;
        assert!(matches!(result, Err(GeoError::Unavailable(_))));
    }

    #[test]
    fn test_error_payload_parses() {
        let body: IpApiResponse =
            serde_json::from_str(r#"{"ip":"10.0.0.1","error":true,"reason":"Reserved IP Address"}"#)
                .unwrap();
        assert!(body.error);
        assert!(body.country_name.is_none());
    }
}
