//! HTTP request handlers

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Json, State},
    http::{Extensions, Method, StatusCode, Uri},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::app::AppContext;
use crate::config::GenerationRequest;

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Text generation endpoint
///
/// Validates the body, submits it once to the backend and suspends until
/// that submission resolves.
pub async fn generation(
    State(ctx): State<Arc<AppContext>>,
    method: Method,
    uri: Uri,
    extensions: Extensions,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let Json(request) = payload?;
    let submission = request.validate()?;

    // Rejected requests are not access-logged
    tracing::info!(
        "{} - \"{} {}\" - {:?}",
        client_addr(&extensions),
        method,
        uri.path(),
        submission
    );

    let handle = ctx.backend.submit(submission)?;
    let text = ctx.backend.wait(handle).await?;

    Ok(Json(GenerationResponse { text }))
}

/// `ip:port` of the caller, or `-` when the server was not started with connect info
fn client_addr(extensions: &Extensions) -> String {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
}
