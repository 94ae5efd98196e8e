//! Engine backed by a model worker group reached over HTTP
//!
//! The worker group owns the model and its tensor/pipeline-parallel
//! processes. The gateway only ships batches to it:
//! - `POST /init` once at startup with the model spec
//! - `POST /infer` per batch, `{"inputs": [...]}` -> `{"outputs": [...]}`
//! - `POST /clear` on shutdown

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{EngineInput, EngineOutput, InferenceEngine};
use crate::config::{parse_dtype, DType, EngineConfig};
use crate::error::EngineError;

#[derive(Serialize)]
struct InitRequest<'a> {
    model_type: &'a str,
    dtype: DType,
    #[serde(skip_serializing_if = "Option::is_none")]
    checkpoint: Option<&'a Path>,
    tp_init_size: i32,
    pp_init_size: i32,
    max_batch_size: usize,
}

#[derive(Serialize)]
struct InferRequest {
    inputs: Vec<EngineInput>,
}

#[derive(Deserialize)]
struct InferResponse {
    outputs: Vec<EngineOutput>,
}

/// HTTP client for a remote model worker group
pub struct RemoteEngine {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteEngine {
    /// Connect to the worker group at `config.host:config.port` and initialize the model
    pub async fn connect(config: &EngineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build engine HTTP client")?;
        let engine = Self {
            client,
            base_url: config.base_url(),
        };

        let init = InitRequest {
            model_type: &config.model_type,
            dtype: parse_dtype(&config.dtype)?,
            checkpoint: config.checkpoint.as_deref(),
            tp_init_size: config.tp_init_size,
            pp_init_size: config.pp_init_size,
            max_batch_size: config.max_batch_size,
        };

        engine
            .post("/init", &init)
            .await
            .with_context(|| format!("Failed to initialize engine at {}", engine.base_url))?;

        tracing::info!("Connected to engine at {}", engine.base_url);
        Ok(engine)
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, EngineError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl InferenceEngine for RemoteEngine {
    async fn infer(&self, batch: Vec<EngineInput>) -> Result<Vec<EngineOutput>, EngineError> {
        let expected = batch.len();
        let response: InferResponse = self
            .post("/infer", &InferRequest { inputs: batch })
            .await?
            .json()
            .await?;

        if response.outputs.len() != expected {
            return Err(EngineError::Protocol(format!(
                "expected {} outputs, got {}",
                expected,
                response.outputs.len()
            )));
        }
        Ok(response.outputs)
    }

    async fn clear(&self) -> Result<(), EngineError> {
        self.post("/clear", &serde_json::json!({})).await?;
        Ok(())
    }
}
