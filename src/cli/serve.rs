//! HTTP server command

use std::sync::Arc;

use anyhow::Result;

use crate::app::AppContext;
use crate::config::GatewayConfig;
use crate::server;

/// Start the generation server
pub async fn serve(config: GatewayConfig) -> Result<()> {
    let ctx = Arc::new(AppContext::launch(&config).await?);

    tracing::info!("Starting server at http://{}", config.server.addr());

    let result = server::start(Arc::clone(&ctx), config.server).await;
    if let Err(e) = &result {
        // The shutdown hook did not run; release the backend here
        tracing::error!("Server error: {}", e);
        ctx.release().await;
    }
    result
}
