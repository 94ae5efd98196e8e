//! Ordered shutdown: backend teardown, engine clear, then server exit

use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::app::AppContext;

/// Tells a running server to stop serving
#[derive(Clone, Default)]
pub struct ServerHandle {
    exit: CancellationToken,
}

impl ServerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the server has been told to exit
    pub fn should_exit(&self) -> bool {
        self.exit.is_cancelled()
    }

    pub fn force_exit(&self) {
        self.exit.cancel();
    }

    /// Resolves once [`ServerHandle::force_exit`] was called
    pub async fn exited(self) {
        self.exit.cancelled_owned().await
    }
}

/// Release the backend and the engine, then stop the server.
///
/// The server is told to exit last so that in-flight requests are resolved
/// (or failed) by the backend first.
pub async fn shutdown(ctx: &AppContext, server: &ServerHandle) {
    tracing::info!("Shutting down");
    ctx.release().await;
    server.force_exit();
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
