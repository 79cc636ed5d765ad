use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::error::ApiError;
use super::AppState;
use crate::models::{
    Category, CategoryUpdateAll, NewCategory, NewSiteGroup, OrderRequest, Site, SiteGroup,
    SiteInput, SiteOrderRequest,
};

/// Sites returned by the frequently-visited listing
const FREQUENT_SITES: i64 = 10;

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

#[derive(Serialize)]
pub struct CreatedResponse {
    pub success: bool,
    pub id: i64,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: i64,
    pub database: &'static str,
}

fn created(id: i64) -> (StatusCode, Json<CreatedResponse>) {
    (
        StatusCode::CREATED,
        Json(CreatedResponse { success: true, id }),
    )
}

fn not_found(what: &str) -> ApiError {
    ApiError::NotFound(format!("{what} not found"))
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().timestamp(),
        database: state.backend.as_str(),
    })
}

// Categories

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.storage.list_categories().await?))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let Json(category) = payload?;
    let name = category.name.trim();
    let kind = category.kind.trim();
    if name.is_empty() || kind.is_empty() {
        return Err(ApiError::MalformedInput(
            "Category name and type are required".to_string(),
        ));
    }

    let id = state.storage.create_category(name, kind).await?;
    tracing::info!(id, name, "category created");
    Ok(created(id))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if state.storage.delete_category(id).await? {
        Ok(SuccessResponse::ok())
    } else {
        Err(not_found("Category"))
    }
}

pub async fn reorder_categories(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(order) = payload?;
    state.storage.reorder_categories(&order.ordered_ids).await?;
    Ok(SuccessResponse::ok())
}

pub async fn update_all_categories(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CategoryUpdateAll>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(batch) = payload?;
    if batch.updates.iter().any(|u| u.kind.trim().is_empty()) {
        return Err(ApiError::MalformedInput(
            "Every update needs a type".to_string(),
        ));
    }
    state.storage.update_categories(&batch.updates).await?;
    Ok(SuccessResponse::ok())
}

// Sites

pub async fn list_sites(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Site>>, ApiError> {
    Ok(Json(state.storage.list_sites().await?))
}

pub async fn frequent_sites(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Site>>, ApiError> {
    Ok(Json(state.storage.frequent_sites(FREQUENT_SITES).await?))
}

fn validated_site(payload: Result<Json<SiteInput>, JsonRejection>) -> Result<SiteInput, ApiError> {
    let Json(site) = payload?;
    if !site.is_complete() {
        return Err(ApiError::MalformedInput(
            "categoryId, name and url are required".to_string(),
        ));
    }
    Ok(site)
}

pub async fn create_site(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SiteInput>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let site = validated_site(payload)?;
    let id = state.storage.create_site(&site).await?;
    tracing::info!(id, category_id = site.category_id, "site created");
    Ok(created(id))
}

pub async fn update_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    payload: Result<Json<SiteInput>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let site = validated_site(payload)?;
    if state.storage.update_site(id, &site).await? {
        Ok(SuccessResponse::ok())
    } else {
        Err(not_found("Site"))
    }
}

pub async fn delete_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if state.storage.delete_site(id).await? {
        Ok(SuccessResponse::ok())
    } else {
        Err(not_found("Site"))
    }
}

pub async fn record_site_visit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if state.storage.record_site_visit(id).await? {
        Ok(SuccessResponse::ok())
    } else {
        Err(not_found("Site"))
    }
}

pub async fn reorder_sites(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SiteOrderRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(order) = payload?;
    if order.category_id <= 0 {
        return Err(ApiError::MalformedInput("categoryId is required".to_string()));
    }
    state
        .storage
        .reorder_sites(order.category_id, &order.ordered_ids)
        .await?;
    Ok(SuccessResponse::ok())
}

// Site groups

pub async fn list_site_groups(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SiteGroup>>, ApiError> {
    Ok(Json(state.storage.list_site_groups().await?))
}

pub async fn create_site_group(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewSiteGroup>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let Json(group) = payload?;
    let name = group.name.trim();
    if name.is_empty() {
        return Err(ApiError::MalformedInput("Group name is required".to_string()));
    }

    let id = state
        .storage
        .create_site_group(
            name,
            group.color.as_deref().unwrap_or_default(),
            group.icon.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(created(id))
}
