//! Inference engine configuration settings

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which engine implementation serves generations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelClass {
    /// In-process engine that echoes the prompt back (smoke tests)
    #[default]
    Echo,
    /// Model worker group reached over HTTP at `host:port`
    Remote,
}

impl fmt::Display for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelClass::Echo => f.write_str("echo"),
            ModelClass::Remote => f.write_str("remote"),
        }
    }
}

/// Numeric precision the model runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    F32,
    F16,
    BF16,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => f.write_str("f32"),
            DType::F16 => f.write_str("f16"),
            DType::BF16 => f.write_str("bf16"),
        }
    }
}

/// Engine-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine implementation
    #[serde(default)]
    pub model_class: ModelClass,

    /// Model architecture name forwarded to the engine (e.g. "opt-125m")
    #[serde(default = "default_model_type")]
    pub model_type: String,

    /// Maximum batch size the engine accepts per forward pass
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Tensor-parallel process count, -1 lets the engine decide
    #[serde(default = "default_parallel_size")]
    pub tp_init_size: i32,

    /// Pipeline-parallel process count, -1 lets the engine decide
    #[serde(default = "default_parallel_size")]
    pub pp_init_size: i32,

    /// Engine host
    #[serde(default = "default_host")]
    pub host: String,

    /// Engine port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Data type for inference (f32, f16, bf16)
    #[serde(default = "default_dtype")]
    pub dtype: String,

    /// Checkpoint to initialize the model from; default-initialized when unset
    #[serde(default)]
    pub checkpoint: Option<PathBuf>,

    /// Tokenizer file or directory used for pre/post-processing
    #[serde(default)]
    pub tokenizer_path: Option<PathBuf>,

    /// Upper bound in seconds on any single call to a remote engine
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_model_type() -> String {
    "default".to_string()
}

fn default_max_batch_size() -> usize {
    1
}

fn default_parallel_size() -> i32 {
    -1
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    29500
}

fn default_dtype() -> String {
    "f32".to_string()
}

fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_class: ModelClass::default(),
            model_type: default_model_type(),
            max_batch_size: default_max_batch_size(),
            tp_init_size: default_parallel_size(),
            pp_init_size: default_parallel_size(),
            host: default_host(),
            port: default_port(),
            dtype: default_dtype(),
            checkpoint: None,
            tokenizer_path: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl EngineConfig {
    /// Base URL of the engine worker group
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
