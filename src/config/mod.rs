//! Configuration system for genserve
//!
//! GatewayConfig groups the engine, server and batching settings. It can be
//! loaded from YAML or JSON and is then overridden by command-line flags.

mod batching;
mod engine;
mod generation;
mod server;

pub use batching::BatchConfig;
pub use engine::{DType, EngineConfig, ModelClass};
pub use generation::{GenerationRequest, SamplingParams, Submission};
pub use server::ServerConfig;

use std::path::Path;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Parse a dtype string into a `DType`.
///
/// Accepts short and long forms: "f32"/"float32", "f16"/"float16", "bf16"/"bfloat16".
pub fn parse_dtype(s: &str) -> Result<DType> {
    match s {
        "f32" | "float32" => Ok(DType::F32),
        "f16" | "float16" => Ok(DType::F16),
        "bf16" | "bfloat16" => Ok(DType::BF16),
        other => Err(anyhow!("unknown dtype: '{}'", other)),
    }
}

/// Gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Inference engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Executor batching settings
    #[serde(default)]
    pub batching: BatchConfig,
}

impl GatewayConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration, picking the format from the file extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(path),
            Some("yaml") | Some("yml") => Self::from_yaml(path),
            _ => Err(anyhow!(
                "unsupported config format: {} (expected .yaml, .yml or .json)",
                path.display()
            )),
        }
    }

    /// Check settings that serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        parse_dtype(&self.engine.dtype)?;
        if self.engine.max_batch_size == 0 {
            return Err(anyhow!("engine.max_batch_size must be greater than 0"));
        }
        if self.batching.max_batch_size == 0 {
            return Err(anyhow!("batching.max_batch_size must be greater than 0"));
        }
        if self.batching.max_queue_size == 0 {
            return Err(anyhow!("batching.max_queue_size must be greater than 0"));
        }
        Ok(())
    }
}
