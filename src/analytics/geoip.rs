//! GeoIP lookup service using MaxMind GeoLite2/GeoIP2 MMDB
//!
//! Lookups run against a memory-mapped City database, so they are cheap
//! enough to run inline on the request path.

use anyhow::{Context, Result};
use async_trait::async_trait;
use maxminddb::{geoip2, Mmap, Reader};
use std::net::IpAddr;
use std::sync::Arc;

use crate::analytics::locator::{GeoError, GeoLocator};
use crate::analytics::models::GeoLocation;

/// GeoIP lookup service backed by a City database
#[derive(Clone)]
pub struct GeoIpService {
    city_reader: Option<Arc<Reader<Mmap>>>,
}

impl GeoIpService {
    /// Create a new GeoIP service from an MMDB file path
    ///
    /// # Arguments
    /// * `city_path` - Optional path to the MaxMind GeoLite2-City or GeoIP2-City .mmdb file
    pub fn new(city_path: Option<&str>) -> Result<Self> {
        let city_reader = if let Some(path) = city_path {
            let reader = unsafe { Reader::open_mmap(path) }
                .with_context(|| format!("Failed to open GeoIP City database at {}", path))?;
            Some(Arc::new(reader))
        } else {
            None
        };

        Ok(Self { city_reader })
    }

    /// Lookup country and city names for an IP address
    ///
    /// Returns `None` when no database is loaded or the address has no entry.
    pub fn lookup(&self, ip: IpAddr) -> Option<GeoLocation> {
        let reader = self.city_reader.as_ref()?;
        let result = reader.lookup(ip).ok()?;

        if let Ok(Some(city)) = result.decode::<geoip2::City>() {
            let location =
                GeoLocation::from_parts(city.country.names.english, city.city.names.english);
            if !location.is_unknown() {
                return Some(location);
            }
        }

        // The City database is a superset of Country data, so a Country decode
        // still yields the country when city fields are absent.
        if let Ok(Some(country)) = result.decode::<geoip2::Country>() {
            let location = GeoLocation::from_parts(country.country.names.english, None);
            if !location.is_unknown() {
                return Some(location);
            }
        }

        None
    }
}

#[async_trait]
impl GeoLocator for GeoIpService {
    async fn locate(&self, ip: IpAddr) -> Result<GeoLocation, GeoError> {
        if self.city_reader.is_none() {
            return Err(GeoError::Disabled);
        }
        self.lookup(ip).ok_or(GeoError::NotFound)
    }
}
