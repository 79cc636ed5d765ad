//! Data models for analytics

use serde::{Deserialize, Serialize};

use crate::models::UNKNOWN;

/// Geographic location derived from a client address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Country name
    pub country: String,

    /// City name
    pub city: String,
}

impl GeoLocation {
    /// Location recorded when no lookup result is available
    pub fn unknown() -> Self {
        Self {
            country: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
        }
    }

    /// Build from optional lookup fields, substituting the sentinel for blanks
    pub fn from_parts(country: Option<&str>, city: Option<&str>) -> Self {
        let pick = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(UNKNOWN)
                .to_string()
        };

        Self {
            country: pick(country),
            city: pick(city),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.country == UNKNOWN && self.city == UNKNOWN
    }
}

impl Default for GeoLocation {
    fn default() -> Self {
        Self::unknown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_fills_blanks() {
        let location = GeoLocation::from_parts(Some("Germany"), Some("  "));
        assert_eq!(location.country, "Germany");
        assert_eq!(location.city, "unknown");
        assert!(!location.is_unknown());

        assert!(GeoLocation::from_parts(None, None).is_unknown());
    }
}
