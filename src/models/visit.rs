use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Placeholder for client details that could not be determined
pub const UNKNOWN: &str = "unknown";

/// Referrer recorded when the client sent none
pub const DIRECT_REFERRER: &str = "direct";

/// One row per session-window a browsing session was active in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    pub id: i64,
    pub ip_address: String,
    pub user_agent: String,
    pub referrer: String,
    pub country: String,
    pub city: String,
    pub session_id: String,
    /// Session start (Unix timestamp)
    pub visit_time: i64,
    /// Last touch (Unix timestamp)
    pub last_active: i64,
    pub page_views: i64,
}

/// Fields for a visit row that does not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVisit {
    pub ip_address: String,
    pub user_agent: String,
    pub referrer: String,
    pub country: String,
    pub city: String,
    pub session_id: String,
}

/// Point-in-time aggregate counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitStats {
    pub total: i64,
    pub today: i64,
    pub online: i64,
    pub unique: i64,
}

/// Visit count for a single (country, city) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LocationCount {
    pub country: String,
    pub city: String,
    pub count: i64,
}
