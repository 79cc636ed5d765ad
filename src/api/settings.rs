//! Settings, user preferences and custom music handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::ApiError;
use super::handlers::{CreatedResponse, SuccessResponse};
use super::AppState;
use crate::models::{MusicInput, MusicTrack, OrderRequest};
use crate::storage::KvTable;

/// Flatten a JSON object into stored string pairs
///
/// Strings are kept verbatim, numbers and booleans keep their JSON text and
/// nulls are dropped.
pub fn flatten_entries(object: Map<String, Value>) -> Result<BTreeMap<String, String>, ApiError> {
    let mut entries = BTreeMap::new();
    for (key, value) in object {
        if key.trim().is_empty() {
            return Err(ApiError::MalformedInput("Keys must not be empty".to_string()));
        }
        let stored = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Bool(_) | Value::Number(_) => value.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(ApiError::MalformedInput(format!(
                    "Value for '{key}' must be a string, number or boolean"
                )));
            }
        };
        entries.insert(key, stored);
    }
    Ok(entries)
}

async fn read_table(
    state: &AppState,
    table: KvTable,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    Ok(Json(state.storage.get_entries(table).await?))
}

async fn write_table(
    state: &AppState,
    table: KvTable,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(object) = payload?;
    let entries = flatten_entries(object)?;
    state.storage.upsert_entries(table, &entries).await?;
    tracing::debug!(table = table.table_name(), keys = entries.len(), "entries saved");
    Ok(SuccessResponse::ok())
}

pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    read_table(&state, KvTable::Settings).await
}

pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    write_table(&state, KvTable::Settings, payload).await
}

pub async fn get_user_preferences(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    read_table(&state, KvTable::UserPreferences).await
}

pub async fn save_user_preferences(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    write_table(&state, KvTable::UserPreferences, payload).await
}

// Custom music

fn validated_track(
    payload: Result<Json<MusicInput>, JsonRejection>,
) -> Result<MusicInput, ApiError> {
    let Json(track) = payload?;
    if !track.is_complete() {
        return Err(ApiError::MalformedInput("title and url are required".to_string()));
    }
    Ok(track)
}

pub async fn list_music(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MusicTrack>>, ApiError> {
    Ok(Json(state.storage.list_music().await?))
}

pub async fn create_music(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MusicInput>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let track = validated_track(payload)?;
    let id = state.storage.create_music(&track).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse { success: true, id }),
    ))
}

pub async fn update_music(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    payload: Result<Json<MusicInput>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let track = validated_track(payload)?;
    if state.storage.update_music(id, &track).await? {
        Ok(SuccessResponse::ok())
    } else {
        Err(ApiError::NotFound("Track not found".to_string()))
    }
}

pub async fn delete_music(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if state.storage.delete_music(id).await? {
        Ok(SuccessResponse::ok())
    } else {
        Err(ApiError::NotFound("Track not found".to_string()))
    }
}

pub async fn reorder_music(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(order) = payload?;
    state.storage.reorder_music(&order.ordered_ids).await?;
    Ok(SuccessResponse::ok())
}
