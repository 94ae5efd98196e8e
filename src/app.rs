//! Process-wide application context
//!
//! Built once at startup and shared by the route handlers and the shutdown
//! hook.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::GatewayConfig;
use crate::engine::{
    build_engine, ExecutionBackend, Executor, InferenceEngine, DEFAULT_TEARDOWN_TIMEOUT,
};
use crate::tokenizer::{Tokenizer, TokenizerTrait};

/// Everything a request handler needs
pub struct AppContext {
    pub backend: Arc<dyn ExecutionBackend>,
    pub engine: Arc<dyn InferenceEngine>,
    pub tokenizer: Option<Arc<dyn TokenizerTrait>>,
    /// Bound on the engine clear during [`AppContext::release`]
    pub shutdown_timeout: Duration,
}

impl AppContext {
    pub fn new(
        backend: Arc<dyn ExecutionBackend>,
        engine: Arc<dyn InferenceEngine>,
        tokenizer: Option<Arc<dyn TokenizerTrait>>,
    ) -> Self {
        Self {
            backend,
            engine,
            tokenizer,
            shutdown_timeout: DEFAULT_TEARDOWN_TIMEOUT,
        }
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Load the tokenizer, build the engine and start the executor
    pub async fn launch(config: &GatewayConfig) -> Result<Self> {
        config.validate()?;

        let tokenizer: Option<Arc<dyn TokenizerTrait>> = match &config.engine.tokenizer_path {
            Some(path) => Some(Arc::new(Tokenizer::from_path(path)?)),
            None => None,
        };

        let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
        let engine = build_engine(&config.engine).await?;
        let executor = Executor::start(
            Arc::clone(&engine),
            tokenizer.clone(),
            config.batching.clone(),
        )
        .with_teardown_timeout(shutdown_timeout);

        Ok(Self::new(Arc::new(executor), engine, tokenizer).with_shutdown_timeout(shutdown_timeout))
    }

    /// Tear down the backend, then release the engine.
    ///
    /// Failures are logged and never stop the sequence. The backend bounds
    /// its own teardown; the engine clear is abandoned after `shutdown_timeout`.
    pub async fn release(&self) {
        if let Err(e) = self.backend.teardown().await {
            tracing::error!("Backend teardown failed: {}", e);
        }
        match tokio::time::timeout(self.shutdown_timeout, self.engine.clear()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("Engine clear failed: {}", e),
            Err(_) => tracing::error!(
                "Engine clear did not finish within {:?}, abandoned",
                self.shutdown_timeout
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationRequest, ModelClass};

    #[tokio::test]
    async fn test_launch_echo_and_release() {
        let config = GatewayConfig::default();
        assert_eq!(config.engine.model_class, ModelClass::Echo);

        let ctx = AppContext::launch(&config).await.unwrap();
        assert!(ctx.tokenizer.is_none());
        assert_eq!(
            ctx.shutdown_timeout,
            Duration::from_secs(config.server.shutdown_timeout_secs)
        );

        let submission = GenerationRequest {
            prompt: "one two three".to_string(),
            max_tokens: 2,
            top_k: None,
            top_p: None,
            temperature: None,
        }
        .validate()
        .unwrap();
        let handle = ctx.backend.submit(submission.clone()).unwrap();
        assert_eq!(ctx.backend.wait(handle).await.unwrap(), "one two");

        ctx.release().await;
        assert!(ctx.backend.submit(submission).is_err());
    }

    #[tokio::test]
    async fn test_launch_rejects_invalid_config() {
        let mut config = GatewayConfig::default();
        config.engine.dtype = "fp8".to_string();
        assert!(AppContext::launch(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_launch_fails_on_missing_tokenizer() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GatewayConfig::default();
        config.engine.tokenizer_path = Some(dir.path().join("nope.json"));
        assert!(AppContext::launch(&config).await.is_err());
    }
}
