//! Integration tests for catalog, settings and music endpoints plus the
//! shared HTTP envelope (errors, admin token, CORS, front-end fallback)

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use starnav::analytics::NoopLocator;
use starnav::api::{self, AppState};
use starnav::auth::AdminAuth;
use starnav::config::{DatabaseBackend, FrontendConfig, VisitorConfig};
use starnav::storage::{SqliteStorage, Storage};
use starnav::visitors::{SystemClock, VisitTracker};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const TOKEN: &str = "test-admin-token";

async fn create_test_state() -> Arc<AppState> {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    let storage = Arc::new(storage);

    let tracker = VisitTracker::new(
        storage.clone(),
        Arc::new(NoopLocator),
        Arc::new(SystemClock),
        &VisitorConfig::default(),
        Duration::from_millis(100),
    );

    Arc::new(AppState {
        storage,
        tracker: Arc::new(tracker),
        backend: DatabaseBackend::Sqlite,
        recent_limit: 20,
    })
}

async fn create_test_app() -> Router {
    api::create_api_router(create_test_state().await, Arc::new(AdminAuth::disabled()))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn empty(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app().await;

    let (status, json) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["database"], "sqlite");
    assert!(json["timestamp"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_category_lifecycle() {
    let app = create_test_app().await;

    let (status, json) = send(
        &app,
        json_request(Method::POST, "/api/categories", json!({"name": "Dev", "type": "tools"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);
    let dev = json["id"].as_i64().unwrap();

    let (_, json) = send(
        &app,
        json_request(Method::POST, "/api/categories", json!({"name": "News", "type": "links"})),
    )
    .await;
    let news = json["id"].as_i64().unwrap();

    let (_, json) = send(&app, get("/api/categories")).await;
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Dev", "News"]);
    assert_eq!(json[0]["type"], "tools");
    assert_eq!(json[1]["displayOrder"], 2);

    let (status, _) = send(
        &app,
        json_request(Method::POST, "/api/categories/order", json!({"orderedIds": [news, dev]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&app, get("/api/categories")).await;
    assert_eq!(json[0]["id"], news);
    assert_eq!(json[1]["id"], dev);

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/categories/update-all",
            json!({"updates": [{"id": dev, "type": "bookmarks", "displayOrder": 0},
                               {"id": news, "type": "links", "displayOrder": 5}]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&app, get("/api/categories")).await;
    assert_eq!(json[0]["id"], dev);
    assert_eq!(json[0]["type"], "bookmarks");

    let (status, json) = send(&app, empty(Method::DELETE, &format!("/api/categories/{dev}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let (status, json) = send(&app, empty(Method::DELETE, &format!("/api/categories/{dev}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_category_validation() {
    let app = create_test_app().await;

    let (status, json) = send(
        &app,
        json_request(Method::POST, "/api/categories", json!({"name": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let malformed = Request::builder()
        .method(Method::POST)
        .uri("/api/categories")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_site_lifecycle() {
    let app = create_test_app().await;

    let (_, json) = send(
        &app,
        json_request(Method::POST, "/api/categories", json!({"name": "Dev", "type": "tools"})),
    )
    .await;
    let category = json["id"].as_i64().unwrap();

    let mut ids = Vec::new();
    for (name, url) in [("Docs", "https://docs.rs"), ("Crates", "https://crates.io")] {
        let (status, json) = send(
            &app,
            json_request(
                Method::POST,
                "/api/sites",
                json!({"categoryId": category, "name": name, "url": url, "tags": "rust"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(json["id"].as_i64().unwrap());
    }

    let (_, json) = send(&app, get("/api/sites")).await;
    let sites = json.as_array().unwrap();
    assert_eq!(sites.len(), 2);
    assert_eq!(sites[0]["name"], "Docs");
    assert_eq!(sites[0]["visitCount"], 0);
    assert_eq!(sites[1]["displayOrder"], 2);

    for _ in 0..3 {
        let (status, _) = send(
            &app,
            empty(Method::POST, &format!("/api/sites/{}/visit", ids[1])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, json) = send(&app, get("/api/sites/frequent")).await;
    assert_eq!(json[0]["id"], ids[1]);
    assert_eq!(json[0]["visitCount"], 3);

    let (status, _) = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/api/sites/{}", ids[0]),
            json!({"categoryId": category, "name": "docs.rs", "url": "https://docs.rs/"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/sites/order",
            json!({"categoryId": category, "orderedIds": [ids[1], ids[0]]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&app, get("/api/sites")).await;
    assert_eq!(json[0]["id"], ids[1]);
    assert_eq!(json[1]["name"], "docs.rs");

    let (status, _) = send(
        &app,
        json_request(
            Method::PUT,
            "/api/sites/9999",
            json!({"categoryId": category, "name": "x", "url": "https://x"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, empty(Method::POST, "/api/sites/9999/visit")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, empty(Method::DELETE, &format!("/api/sites/{}", ids[0]))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = send(&app, get("/api/sites")).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_site_requires_fields() {
    let app = create_test_app().await;

    let (status, _) = send(
        &app,
        json_request(Method::POST, "/api/sites", json!({"name": "No url", "categoryId": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_site_groups() {
    let app = create_test_app().await;

    let (status, _) = send(
        &app,
        json_request(Method::POST, "/api/site-groups", json!({"name": "Work", "color": "#336699"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    send(
        &app,
        json_request(Method::POST, "/api/site-groups", json!({"name": "Play"})),
    )
    .await;

    let (_, json) = send(&app, get("/api/site-groups")).await;
    assert_eq!(json[0]["name"], "Work");
    assert_eq!(json[0]["color"], "#336699");
    assert_eq!(json[1]["name"], "Play");
    assert_eq!(json[1]["icon"], "");
}

#[tokio::test]
async fn test_settings_and_preferences_are_separate() {
    let app = create_test_app().await;

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/settings",
            json!({"siteTitle": "StarNav", "columns": 4, "showClock": false, "ignored": null}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    send(
        &app,
        json_request(Method::POST, "/api/user-preferences", json!({"theme": "dark"})),
    )
    .await;

    let (_, settings) = send(&app, get("/api/settings")).await;
    assert_eq!(
        settings,
        json!({"siteTitle": "StarNav", "columns": "4", "showClock": "false"})
    );

    let (_, prefs) = send(&app, get("/api/user-preferences")).await;
    assert_eq!(prefs, json!({"theme": "dark"}));

    // Upsert replaces existing values
    send(
        &app,
        json_request(Method::POST, "/api/settings", json!({"siteTitle": "Home"})),
    )
    .await;
    let (_, settings) = send(&app, get("/api/settings")).await;
    assert_eq!(settings["siteTitle"], "Home");
    assert_eq!(settings["columns"], "4");

    let (status, _) = send(
        &app,
        json_request(Method::POST, "/api/settings", json!({"layout": {"grid": true}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_custom_music() {
    let app = create_test_app().await;

    let (status, json) = send(
        &app,
        json_request(
            Method::POST,
            "/api/custom-music",
            json!({"title": "Night Drive", "artist": "Synth", "url": "https://cdn.example/a.mp3"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let first = json["id"].as_i64().unwrap();

    let (_, json) = send(
        &app,
        json_request(
            Method::POST,
            "/api/custom-music",
            json!({"title": "Morning", "url": "https://cdn.example/b.mp3"}),
        ),
    )
    .await;
    let second = json["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        json_request(Method::POST, "/api/custom-music", json!({"title": "No url"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(
        &app,
        json_request(
            Method::POST,
            "/api/custom-music/order",
            json!({"orderedIds": [second, first]}),
        ),
    )
    .await;
    let (_, json) = send(&app, get("/api/custom-music")).await;
    assert_eq!(json[0]["id"], second);
    assert_eq!(json[1]["artist"], "Synth");

    // Disabled tracks are hidden from the listing
    let (status, _) = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/api/custom-music/{first}"),
            json!({"title": "Night Drive", "url": "https://cdn.example/a.mp3", "enabled": false}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = send(&app, get("/api/custom-music")).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let delete_second = || empty(Method::DELETE, &format!("/api/custom-music/{second}"));
    let (status, _) = send(&app, delete_second()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, delete_second()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let app = create_test_app().await;

    let (status, json) = send(&app, get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Resource not found");

    let (status, json) = send(&app, empty(Method::PATCH, "/api/categories")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json["error"], "Method PATCH not allowed");

    let (status, _) = send(&app, empty(Method::DELETE, "/api/visit-track")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_admin_token_guards_writes() {
    let state = create_test_state().await;
    let app = api::create_api_router(state, Arc::new(AdminAuth::new(Some(TOKEN.to_string()))));

    let (status, json) = send(
        &app,
        json_request(Method::POST, "/api/categories", json!({"name": "Dev", "type": "tools"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].is_string());

    let authorized = Request::builder()
        .method(Method::POST)
        .uri("/api/categories")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::from(json!({"name": "Dev", "type": "tools"}).to_string()))
        .unwrap();
    let (status, _) = send(&app, authorized).await;
    assert_eq!(status, StatusCode::CREATED);

    // Reads and visitor tracking stay public
    let (status, json) = send(&app, get("/api/categories")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, empty(Method::POST, "/api/visit-track")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, empty(Method::DELETE, "/api/sites/1")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/visit-track")
                .header(header::ORIGIN, "https://nav.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
}

#[tokio::test]
async fn test_frontend_fallback() {
    let app = api::create_app(
        create_test_state().await,
        Arc::new(AdminAuth::disabled()),
        &FrontendConfig::default(),
    );

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let response = app.clone().oneshot(get("/about")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // API misses stay JSON
    let (status, json) = send(&app, get("/api/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Resource not found");
}
