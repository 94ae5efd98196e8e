//! Error types shared by the engine, the executor and the HTTP layer

use std::sync::Arc;

use thiserror::Error;

use crate::engine::Handle;

/// A generation request that violates its parameter bounds.
///
/// Produced before anything is submitted to the backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("max_tokens must be greater than 0, got {0}")]
    MaxTokens(i64),

    #[error("top_k must be greater than 0, got {0}")]
    TopK(i64),

    #[error("top_p must be strictly between 0 and 1, got {0}")]
    TopP(f64),

    #[error("temperature must be strictly between 0 and 1, got {0}")]
    Temperature(f64),
}

/// Failure reported by an inference engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine resources have been released")]
    Cleared,

    #[error("engine transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("engine returned status {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("engine protocol error: {0}")]
    Protocol(String),
}

/// Failure reported by an execution backend while submitting or resolving
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend is shutting down")]
    ShuttingDown,

    #[error("request queue is full ({0})")]
    QueueFull(usize),

    #[error("unknown or already awaited handle {0}")]
    UnknownHandle(Handle),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("executor worker failed: {0}")]
    Worker(String),

    /// Shared because one engine failure resolves every job in its batch
    #[error(transparent)]
    Engine(Arc<EngineError>),
}

impl From<EngineError> for BackendError {
    fn from(err: EngineError) -> Self {
        BackendError::Engine(Arc::new(err))
    }
}
