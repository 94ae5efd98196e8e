//! CLI commands

mod generate;
mod serve;

pub use generate::generate;
pub use serve::serve;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::config::{GatewayConfig, GenerationRequest, ModelClass};

/// genserve - HTTP gateway for batched text generation
#[derive(Parser)]
#[command(name = "genserve")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the generation server
    Serve {
        #[command(flatten)]
        engine: EngineArgs,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Allow cross-origin requests from any origin
        #[arg(long)]
        allow_cors: bool,
    },

    /// Generate text once through the executor and print it
    Generate {
        #[command(flatten)]
        engine: EngineArgs,

        /// Prompt text
        #[arg(long, short)]
        prompt: String,

        /// Maximum tokens to generate
        #[arg(long, default_value = "64", allow_hyphen_values = true)]
        max_tokens: i64,

        /// Top-k sampling
        #[arg(long, allow_hyphen_values = true)]
        top_k: Option<i64>,

        /// Top-p nucleus sampling, strictly between 0 and 1
        #[arg(long)]
        top_p: Option<f64>,

        /// Sampling temperature, strictly between 0 and 1
        #[arg(long)]
        temperature: Option<f64>,
    },
}

/// Settings shared by every command. Flags override the config file.
#[derive(Args, Debug, Default)]
pub struct EngineArgs {
    /// Config file (.yaml, .yml or .json)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Engine implementation
    #[arg(long, value_enum)]
    pub model_class: Option<ModelClass>,

    /// Model architecture name forwarded to the engine
    #[arg(long)]
    pub model_type: Option<String>,

    /// Maximum batch size per engine forward pass
    #[arg(long)]
    pub max_batch_size: Option<usize>,

    /// Tensor-parallel process count (-1 lets the engine decide)
    #[arg(long, allow_hyphen_values = true)]
    pub tp_init_size: Option<i32>,

    /// Pipeline-parallel process count (-1 lets the engine decide)
    #[arg(long, allow_hyphen_values = true)]
    pub pp_init_size: Option<i32>,

    /// Engine host
    #[arg(long)]
    pub engine_host: Option<String>,

    /// Engine port
    #[arg(long)]
    pub engine_port: Option<u16>,

    /// Data type (f32, f16, bf16)
    #[arg(long)]
    pub dtype: Option<String>,

    /// Checkpoint to initialize the model from
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Tokenizer file or directory
    #[arg(long)]
    pub tokenizer_path: Option<PathBuf>,

    /// Log verbosity (overridden by RUST_LOG)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl EngineArgs {
    /// Load the config file, if any, and apply flag overrides
    pub fn load(&self) -> Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::from_file(path)?,
            None => GatewayConfig::default(),
        };

        let engine = &mut config.engine;
        if let Some(model_class) = self.model_class {
            engine.model_class = model_class;
        }
        if let Some(model_type) = &self.model_type {
            engine.model_type = model_type.clone();
        }
        if let Some(max_batch_size) = self.max_batch_size {
            engine.max_batch_size = max_batch_size;
        }
        if let Some(tp) = self.tp_init_size {
            engine.tp_init_size = tp;
        }
        if let Some(pp) = self.pp_init_size {
            engine.pp_init_size = pp;
        }
        if let Some(host) = &self.engine_host {
            engine.host = host.clone();
        }
        if let Some(port) = self.engine_port {
            engine.port = port;
        }
        if let Some(dtype) = &self.dtype {
            engine.dtype = dtype.clone();
        }
        if let Some(checkpoint) = &self.checkpoint {
            engine.checkpoint = Some(checkpoint.clone());
        }
        if let Some(tokenizer_path) = &self.tokenizer_path {
            engine.tokenizer_path = Some(tokenizer_path.clone());
        }
        if let Some(log_level) = &self.log_level {
            config.server.log_level = log_level.clone();
        }

        Ok(config)
    }
}

impl Commands {
    /// Effective configuration for this command
    pub fn config(&self) -> Result<GatewayConfig> {
        match self {
            Commands::Serve {
                engine,
                host,
                port,
                allow_cors,
            } => {
                let mut config = engine.load()?;
                if let Some(host) = host {
                    config.server.host = host.clone();
                }
                if let Some(port) = port {
                    config.server.port = *port;
                }
                if *allow_cors {
                    config.server.allow_cors = true;
                }
                Ok(config)
            }
            Commands::Generate { engine, .. } => engine.load(),
        }
    }

    /// The request a `generate` invocation describes
    pub fn generation_request(&self) -> Option<GenerationRequest> {
        match self {
            Commands::Generate {
                prompt,
                max_tokens,
                top_k,
                top_p,
                temperature,
                ..
            } => Some(GenerationRequest {
                prompt: prompt.clone(),
                max_tokens: *max_tokens,
                top_k: *top_k,
                top_p: *top_p,
                temperature: *temperature,
            }),
            Commands::Serve { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_serve_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "genserve",
            "serve",
            "--model-class",
            "remote",
            "--tp-init-size",
            "4",
            "--pp-init-size",
            "-1",
            "--engine-port",
            "30000",
            "--port",
            "9001",
            "--allow-cors",
            "--log-level",
            "debug",
        ])
        .unwrap();

        let config = cli.command.config().unwrap();
        assert_eq!(config.engine.model_class, ModelClass::Remote);
        assert_eq!(config.engine.tp_init_size, 4);
        assert_eq!(config.engine.pp_init_size, -1);
        assert_eq!(config.engine.port, 30000);
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.log_level, "debug");
        assert!(config.server.allow_cors);
        assert!(cli.command.generation_request().is_none());
    }

    #[test]
    fn test_flags_win_over_config_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            "engine:\n  model_type: opt-1.3b\n  dtype: f16\nserver:\n  port: 7000\n  allow_cors: true\n"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::try_parse_from([
            "genserve", "serve", "--config", &path, "--dtype", "bf16",
        ])
        .unwrap();
        let config = cli.command.config().unwrap();

        assert_eq!(config.engine.model_type, "opt-1.3b");
        assert_eq!(config.engine.dtype, "bf16");
        assert_eq!(config.server.port, 7000);
        assert!(config.server.allow_cors);
    }

    #[test]
    fn test_generate_builds_request() {
        let cli = Cli::try_parse_from([
            "genserve",
            "generate",
            "--prompt",
            "Hello",
            "--max-tokens",
            "5",
            "--top-p",
            "0.9",
            "--tokenizer-path",
            "/tok",
        ])
        .unwrap();

        let request = cli.command.generation_request().unwrap();
        assert_eq!(request.prompt, "Hello");
        assert_eq!(request.max_tokens, 5);
        assert_eq!(request.top_p, Some(0.9));
        assert_eq!(request.top_k, None);

        let config = cli.command.config().unwrap();
        assert_eq!(
            config.engine.tokenizer_path,
            Some(PathBuf::from("/tok"))
        );
    }
}
