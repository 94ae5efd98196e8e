//! genserve - HTTP gateway for batched text generation
//!
//! genserve accepts text-generation requests over HTTP, validates them and
//! hands them to a batching executor in front of an inference engine.
//!
//! # Architecture
//!
//! - **server**: `POST /generation`, request validation, error mapping, shutdown
//! - **engine**: the executor (queueing and batching) and the engines it drives
//! - **app**: the context shared by handlers and the shutdown hook
//!
//! # Example
//!
//! ```bash
//! # Start the server in front of a remote model worker group
//! genserve serve --model-class remote --engine-host 10.0.0.5 --port 8005
//!
//! # Generate once
//! genserve generate --prompt "Hello" --max-tokens 16
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod server;
pub mod tokenizer;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types
pub use app::AppContext;
pub use config::{GatewayConfig, GenerationRequest, ServerConfig};
pub use engine::{ExecutionBackend, Executor, InferenceEngine};
