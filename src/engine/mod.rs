//! Generation backend
//!
//! This module provides the pieces the gateway submits work to:
//! - InferenceEngine: runs a batch of prompts on a model
//! - ExecutionBackend: accepts single requests and resolves them asynchronously
//! - Executor: the batching ExecutionBackend sitting in front of an engine

mod echo;
mod executor;
mod remote;

pub use echo::EchoEngine;
pub use executor::{Executor, DEFAULT_TEARDOWN_TIMEOUT};
pub use remote::RemoteEngine;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, ModelClass, SamplingParams, Submission};
use crate::error::{BackendError, EngineError};

/// Opaque identifier of one in-flight generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One prompt of a batch handed to the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineInput {
    pub prompt: String,
    /// Set when a tokenizer is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_ids: Option<Vec<u32>>,
    #[serde(flatten)]
    pub params: SamplingParams,
}

/// What the engine produced for one input
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EngineOutput {
    Text { text: String },
    Tokens { output_ids: Vec<u32> },
}

/// A model that turns a batch of prompts into generations.
///
/// Outputs are returned in input order, one per input.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn infer(&self, batch: Vec<EngineInput>) -> Result<Vec<EngineOutput>, EngineError>;

    /// Release model weights and device memory
    async fn clear(&self) -> Result<(), EngineError>;
}

/// Accepts generation requests and resolves them without blocking callers.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Queue a request and return its handle
    fn submit(&self, submission: Submission) -> Result<Handle, BackendError>;

    /// Suspend until the request behind `handle` resolves
    async fn wait(&self, handle: Handle) -> Result<String, BackendError>;

    /// Stop accepting work and release resources. Safe to call more than once.
    ///
    /// Must return in bounded time even when the engine is stuck.
    async fn teardown(&self) -> Result<(), BackendError>;
}

/// Build the engine selected by `config.model_class`
pub async fn build_engine(config: &EngineConfig) -> Result<Arc<dyn InferenceEngine>> {
    match &config.checkpoint {
        Some(checkpoint) => tracing::info!(
            "Initializing {} model '{}' from checkpoint {}",
            config.model_class,
            config.model_type,
            checkpoint.display()
        ),
        None => tracing::info!(
            "Initializing {} model '{}' with default weights",
            config.model_class,
            config.model_type
        ),
    }

    let engine: Arc<dyn InferenceEngine> = match config.model_class {
        ModelClass::Echo => Arc::new(EchoEngine::new()),
        ModelClass::Remote => Arc::new(RemoteEngine::connect(config).await?),
    };
    Ok(engine)
}
