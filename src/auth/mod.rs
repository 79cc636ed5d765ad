//! Shared-secret guard for mutating admin routes
//!
//! This is a placeholder, not an identity system: one token configured via
//! `ADMIN_TOKEN` unlocks every write. With no token configured all requests
//! are allowed.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::api::error::ApiError;

pub struct AdminAuth {
    token: Option<String>,
}

impl AdminAuth {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    pub fn disabled() -> Self {
        Self { token: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    pub fn validate(&self, presented: Option<&str>) -> bool {
        match (&self.token, presented) {
            (None, _) => true,
            (Some(expected), Some(presented)) => {
                bool::from(expected.as_bytes().ct_eq(presented.as_bytes()))
            }
            (Some(_), None) => false,
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

pub async fn admin_middleware(
    State(auth): State<Arc<AdminAuth>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if auth.validate(bearer_token(&headers)) {
        next.run(request).await
    } else {
        tracing::warn!(path = %request.uri().path(), "rejected admin request");
        ApiError::Unauthorized.into_response()
    }
}
