//! Route definitions

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{generation, health};
use crate::app::AppContext;

/// Create the API router
pub fn api_routes() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/health", get(health))
        .route("/generation", post(generation))
}
