//! HTTP gateway for text generation
//!
//! Exposes `POST /generation` and `GET /health` in front of an
//! [`ExecutionBackend`](crate::engine::ExecutionBackend).

mod error;
mod handlers;
mod routes;
mod shutdown;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::app::AppContext;
use crate::config::ServerConfig;

pub use error::{ApiError, ErrorDetail, ErrorResponse};
pub use handlers::GenerationResponse;
pub use routes::api_routes;
pub use shutdown::{shutdown, shutdown_signal, ServerHandle};

/// Build the application router
pub fn router(ctx: Arc<AppContext>, config: &ServerConfig) -> Router {
    let mut app = Router::new()
        .merge(api_routes())
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(TraceLayer::new_for_http());

    if config.allow_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app.with_state(ctx)
}

/// Serve until a shutdown signal, then run the ordered shutdown
pub async fn start(ctx: Arc<AppContext>, config: ServerConfig) -> Result<()> {
    let app = router(Arc::clone(&ctx), &config);

    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /health - Health check");
    tracing::info!("  POST /generation - Text generation");
    if config.allow_cors {
        tracing::info!("CORS enabled for all origins");
    }

    let handle = ServerHandle::new();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(handle.clone().exited());
    let mut server = std::pin::pin!(server.into_future());

    tokio::select! {
        result = &mut server => {
            result?;
            return Ok(());
        }
        () = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
        }
    }

    shutdown(&ctx, &handle).await;

    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    match tokio::time::timeout(grace, server).await {
        Ok(result) => result?,
        Err(_) => tracing::warn!("Connections still open after {:?}, exiting anyway", grace),
    }

    tracing::info!("Server stopped");
    Ok(())
}
