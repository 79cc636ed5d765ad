use axum::{
    http::{header, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{admin_middleware, AdminAuth};
use crate::config::FrontendConfig;

use super::analytics::{track_visit, visit_stats};
use super::error::ApiError;
use super::handlers::{
    create_category, create_site, create_site_group, delete_category, delete_site,
    frequent_sites, health_check, list_categories, list_site_groups, list_sites,
    record_site_visit, reorder_categories, reorder_sites, update_all_categories, update_site,
};
use super::settings::{
    create_music, delete_music, get_settings, get_user_preferences, list_music, reorder_music,
    save_settings, save_user_preferences, update_music,
};
use super::static_files::frontend_router;
use super::AppState;

const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);

async fn resource_not_found() -> ApiError {
    ApiError::NotFound("Resource not found".to_string())
}

async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method.to_string())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(CORS_MAX_AGE)
}

/// All `/api` routes
///
/// Mutating catalog, settings and music routes sit behind the admin token;
/// visitor endpoints and reads stay public.
pub fn create_api_router(state: Arc<AppState>, auth: Arc<AdminAuth>) -> Router {
    let guard = middleware::from_fn_with_state(auth, admin_middleware);

    let api = Router::new()
        .route("/health", get(health_check))
        // Visitor accounting
        .route("/visit-track", post(track_visit))
        .route("/visit-stats", get(visit_stats))
        .route("/visitor", post(track_visit).get(visit_stats))
        // Categories
        .route(
            "/categories",
            post(create_category)
                .route_layer(guard.clone())
                .get(list_categories),
        )
        .route(
            "/categories/order",
            post(reorder_categories).route_layer(guard.clone()),
        )
        .route(
            "/categories/update-all",
            post(update_all_categories).route_layer(guard.clone()),
        )
        .route(
            "/categories/{id}",
            delete(delete_category).route_layer(guard.clone()),
        )
        // Sites
        .route(
            "/sites",
            post(create_site).route_layer(guard.clone()).get(list_sites),
        )
        .route("/sites/frequent", get(frequent_sites))
        .route("/sites/order", post(reorder_sites).route_layer(guard.clone()))
        .route(
            "/sites/{id}",
            put(update_site)
                .delete(delete_site)
                .route_layer(guard.clone()),
        )
        .route(
            "/sites/{id}/visit",
            post(record_site_visit).route_layer(guard.clone()),
        )
        .route(
            "/site-groups",
            post(create_site_group)
                .route_layer(guard.clone())
                .get(list_site_groups),
        )
        // Settings
        .route(
            "/settings",
            post(save_settings).route_layer(guard.clone()).get(get_settings),
        )
        .route(
            "/user-preferences",
            post(save_user_preferences)
                .route_layer(guard.clone())
                .get(get_user_preferences),
        )
        // Custom music
        .route(
            "/custom-music",
            post(create_music).route_layer(guard.clone()).get(list_music),
        )
        .route(
            "/custom-music/order",
            post(reorder_music).route_layer(guard.clone()),
        )
        .route(
            "/custom-music/{id}",
            put(update_music).delete(delete_music).route_layer(guard),
        )
        .fallback(resource_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state);

    Router::new().nest("/api", api).layer(cors_layer())
}

/// API plus the front-end bundle
pub fn create_app(state: Arc<AppState>, auth: Arc<AdminAuth>, frontend: &FrontendConfig) -> Router {
    create_api_router(state, auth).merge(frontend_router(frontend.static_dir.as_deref()))
}
