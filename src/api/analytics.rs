//! Visitor tracking handlers

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use super::AppState;
use crate::analytics::extract_client_ip;
use crate::visitors::{TrackedVisit, VisitOverview, VisitRequest};

#[derive(Debug, Deserialize)]
pub struct TrackQueryParams {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub success: bool,
    #[serde(flatten)]
    pub tracked: TrackedVisit,
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Record a page view for the caller's session
pub async fn track_visit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TrackQueryParams>,
    headers: HeaderMap,
) -> Result<Json<TrackResponse>, ApiError> {
    let request = VisitRequest {
        session_id: params.session_id,
        ip: extract_client_ip(&headers),
        user_agent: header_value(&headers, header::USER_AGENT),
        referrer: header_value(&headers, header::REFERER),
    };

    let tracked = state.tracker.track(request).await?;
    tracing::debug!(
        session_id = %tracked.session_id,
        page_views = tracked.visit.page_views,
        "visit tracked"
    );

    Ok(Json(TrackResponse {
        success: true,
        tracked,
    }))
}

/// Counters, top locations and the most recently active records
pub async fn visit_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<VisitOverview>, ApiError> {
    let overview = state.tracker.overview(state.recent_limit).await?;
    Ok(Json(overview))
}
