//! Visitor session accounting
//!
//! Every tracking request runs the same sequence against the store:
//! resolve the session, record the visit, then read the aggregate counters.
//! No state is kept in process between requests, and two concurrent first
//! visits of a brand-new session id may both create a record.

pub mod clock;
pub mod recorder;
pub mod session;
pub mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use recorder::VisitRecorder;
pub use session::{SessionDecision, SessionResolver};
pub use stats::{utc_day_bounds, StatsAggregator};

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::analytics::ip_extractor::anonymize_recorded_ip;
use crate::analytics::{resolve_location, GeoLocator};
use crate::config::VisitorConfig;
use crate::models::{
    LocationCount, NewVisit, VisitRecord, VisitStats, DIRECT_REFERRER, UNKNOWN,
};
use crate::storage::{StorageResult, VisitStore};

/// Number of (country, city) groups reported with the counters
pub const TOP_LOCATIONS: i64 = 10;

const MAX_SESSION_ID_LEN: usize = 128;

/// Client details for one tracking request
#[derive(Debug, Clone, Default)]
pub struct VisitRequest {
    pub session_id: Option<String>,
    pub ip: String,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedVisit {
    pub session_id: String,
    pub visit: VisitRecord,
    pub stats: VisitStats,
    pub locations: Vec<LocationCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisitOverview {
    #[serde(flatten)]
    pub stats: VisitStats,
    pub locations: Vec<LocationCount>,
    pub recent: Vec<VisitRecord>,
}

/// Use the client's session id if it is usable, otherwise mint a new one
pub fn normalize_session_id(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(id)
            if !id.is_empty()
                && id.len() <= MAX_SESSION_ID_LEN
                && !id.chars().any(char::is_control) =>
        {
            id.to_string()
        }
        Some(id) if !id.is_empty() => {
            debug!(len = id.len(), "replacing unusable session id");
            uuid::Uuid::new_v4().to_string()
        }
        _ => uuid::Uuid::new_v4().to_string(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct VisitTracker {
    resolver: SessionResolver,
    recorder: VisitRecorder,
    stats: StatsAggregator,
    locator: Arc<dyn GeoLocator>,
    clock: Arc<dyn Clock>,
    geo_timeout: Duration,
    ip_anonymization: bool,
}

impl VisitTracker {
    pub fn new(
        store: Arc<dyn VisitStore>,
        locator: Arc<dyn GeoLocator>,
        clock: Arc<dyn Clock>,
        config: &VisitorConfig,
        geo_timeout: Duration,
    ) -> Self {
        let window_secs = config
            .session_window_secs
            .clamp(1, VisitorConfig::MAX_SESSION_WINDOW_SECS);
        Self {
            resolver: SessionResolver::new(Arc::clone(&store), window_secs),
            recorder: VisitRecorder::new(Arc::clone(&store)),
            stats: StatsAggregator::new(store, window_secs),
            locator,
            clock,
            geo_timeout,
            ip_anonymization: config.ip_anonymization,
        }
    }

    /// Record one visit and return the counters that include it
    pub async fn track(&self, request: VisitRequest) -> StorageResult<TrackedVisit> {
        let now = self.clock.now();
        let session_id = normalize_session_id(request.session_id.as_deref());
        let ip = if request.ip.trim().is_empty() {
            UNKNOWN.to_string()
        } else {
            request.ip.trim().to_string()
        };
        let ip = if self.ip_anonymization {
            anonymize_recorded_ip(&ip)
        } else {
            ip
        };

        let decision = self.resolver.resolve(&ip, &session_id, now).await?;

        let continued = match decision {
            SessionDecision::Continue(id) => self.recorder.continue_session(id, now).await?,
            SessionDecision::Start => None,
        };

        let record = match continued {
            Some(record) => record,
            None => {
                // Location is only looked up for records about to be created
                let location =
                    resolve_location(self.locator.as_ref(), &ip, self.geo_timeout).await;
                let visit = NewVisit {
                    ip_address: ip,
                    user_agent: request
                        .user_agent
                        .map(|ua| ua.trim().to_string())
                        .unwrap_or_default(),
                    referrer: non_blank(request.referrer)
                        .unwrap_or_else(|| DIRECT_REFERRER.to_string()),
                    country: location.country,
                    city: location.city,
                    session_id: session_id.clone(),
                };
                self.recorder.start_session(&visit, now).await?
            }
        };

        let stats = self.stats.snapshot(now).await?;
        let locations = self.stats.locations(TOP_LOCATIONS).await?;

        Ok(TrackedVisit {
            session_id,
            visit: record,
            stats,
            locations,
        })
    }

    pub async fn snapshot(&self) -> StorageResult<VisitStats> {
        self.stats.snapshot(self.clock.now()).await
    }

    /// Counters plus the most recently active records
    pub async fn overview(&self, recent_limit: i64) -> StorageResult<VisitOverview> {
        let stats = self.snapshot().await?;
        let locations = self.stats.locations(TOP_LOCATIONS).await?;
        let recent = self.stats.recent(recent_limit).await?;

        Ok(VisitOverview {
            stats,
            locations,
            recent,
        })
    }
}
