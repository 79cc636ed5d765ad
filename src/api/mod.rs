pub mod analytics;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod settings;
pub mod static_files;

pub use error::{ApiError, ErrorResponse};
pub use routes::{create_api_router, create_app};

use std::sync::Arc;

use crate::config::DatabaseBackend;
use crate::storage::Storage;
use crate::visitors::VisitTracker;

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub tracker: Arc<VisitTracker>,
    pub backend: DatabaseBackend,
    /// Records returned by the visitor statistics endpoint
    pub recent_limit: i64,
}
