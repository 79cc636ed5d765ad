//! Visitor enrichment: client address extraction and geolocation
//!
//! Geolocation is an optional, best-effort external lookup. A disabled or
//! failing provider never affects visit accounting; visits are then recorded
//! with the `unknown` location.

pub mod geoip;
pub mod http_lookup;
pub mod ip_extractor;
pub mod locator;
pub mod models;

pub use geoip::GeoIpService;
pub use http_lookup::HttpLocator;
pub use ip_extractor::{anonymize_ip, extract_client_ip};
pub use locator::{build_locator, resolve_location, GeoError, GeoLocator, NoopLocator};
pub use models::GeoLocation;
