//! Optional tokenizer used by the executor for pre/post-processing
//!
//! Loaded once at startup from `engine.tokenizer_path` and shared by every
//! request. When it is absent, prompts travel to the engine as plain text.

use std::path::Path;

use anyhow::{anyhow, Result};

/// Trait for tokenizers used by genserve
pub trait TokenizerTrait: Send + Sync {
    /// Encode text to token IDs
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode token IDs to text
    fn decode(&self, ids: &[u32]) -> Result<String>;

    /// Get vocabulary size
    fn vocab_size(&self) -> usize;
}

/// Tokenizer wrapper around a HuggingFace `tokenizer.json`.
pub struct Tokenizer {
    inner: tokenizers::Tokenizer,
}

impl Tokenizer {
    /// Load a tokenizer from a `tokenizer.json` file or a directory holding one.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = if path.is_dir() {
            path.join("tokenizer.json")
        } else {
            path.to_path_buf()
        };

        let inner = tokenizers::Tokenizer::from_file(&file)
            .map_err(|e| anyhow!("Failed to load tokenizer '{}': {}", file.display(), e))?;

        tracing::info!(
            "Loaded tokenizer from {} (vocab size {})",
            file.display(),
            inner.get_vocab_size(true)
        );

        Ok(Self { inner })
    }

    /// Encode text to token IDs, adding the tokenizer's special tokens
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| anyhow!("Encode error: {}", e))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Decode token IDs to text, skipping special tokens
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| anyhow!("Decode error: {}", e))
    }

    /// Get vocabulary size, including added tokens
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}

impl TokenizerTrait for Tokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        Tokenizer::encode(self, text)
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        Tokenizer::decode(self, ids)
    }

    fn vocab_size(&self) -> usize {
        Tokenizer::vocab_size(self)
    }
}
