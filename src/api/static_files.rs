use axum::{
    body::Body,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use mime_guess::from_path;
use rust_embed::RustEmbed;
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};

#[derive(RustEmbed)]
#[folder = "frontend/dist"]
pub struct Assets;

/// Front-end router for everything outside `/api`
///
/// A configured directory is served as-is with `index.html` for missing
/// paths; otherwise the bundle compiled into the binary is used.
pub fn frontend_router(static_dir: Option<&str>) -> Router {
    match static_dir {
        Some(dir) => {
            let index = Path::new(dir).join("index.html");
            Router::new()
                .fallback_service(ServeDir::new(dir).not_found_service(ServeFile::new(index)))
        }
        None => Router::new().fallback(serve_embedded),
    }
}

fn asset_response(path: &str, data: Vec<u8>) -> Response {
    let mime = from_path(path).first_or_octet_stream();
    ([(header::CONTENT_TYPE, mime.as_ref().to_string())], Body::from(data)).into_response()
}

/// Serve from embedded assets
pub async fn serve_embedded(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    let path = if path.is_empty() { "index.html" } else { path };

    if let Some(content) = Assets::get(path) {
        return asset_response(path, content.data.into_owned());
    }

    // Client-side routes have no extension
    if !path.contains('.') {
        if let Some(index) = Assets::get("index.html") {
            return asset_response("index.html", index.data.into_owned());
        }
    }

    (StatusCode::NOT_FOUND, "404 Not Found").into_response()
}
