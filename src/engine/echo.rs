//! In-process engine that echoes prompts back

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::{EngineInput, EngineOutput, InferenceEngine};
use crate::error::EngineError;

/// Returns the first `max_tokens` units of each prompt.
///
/// A unit is an input id when the prompt was tokenized and a
/// whitespace-separated word otherwise. Useful to exercise the gateway
/// end to end without a model.
#[derive(Debug, Default)]
pub struct EchoEngine {
    cleared: AtomicBool,
}

impl EchoEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn echo(input: EngineInput) -> EngineOutput {
        let limit = input.params.max_tokens;
        match input.input_ids {
            Some(mut ids) => {
                ids.truncate(limit);
                EngineOutput::Tokens { output_ids: ids }
            }
            None => EngineOutput::Text {
                text: input
                    .prompt
                    .split_whitespace()
                    .take(limit)
                    .collect::<Vec<_>>()
                    .join(" "),
            },
        }
    }
}

#[async_trait]
impl InferenceEngine for EchoEngine {
    async fn infer(&self, batch: Vec<EngineInput>) -> Result<Vec<EngineOutput>, EngineError> {
        if self.cleared.load(Ordering::Acquire) {
            return Err(EngineError::Cleared);
        }
        tracing::debug!("Echoing batch of {}", batch.len());
        Ok(batch.into_iter().map(Self::echo).collect())
    }

    async fn clear(&self) -> Result<(), EngineError> {
        self.cleared.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplingParams;

    fn input(prompt: &str, ids: Option<Vec<u32>>, max_tokens: usize) -> EngineInput {
        EngineInput {
            prompt: prompt.to_string(),
            input_ids: ids,
            params: SamplingParams::with_max_tokens(max_tokens),
        }
    }

    #[tokio::test]
    async fn test_echo_truncates_words_and_ids() {
        let engine = EchoEngine::new();
        let outputs = engine
            .infer(vec![
                input("the quick  brown fox", None, 3),
                input("ignored", Some(vec![7, 8, 9]), 2),
            ])
            .await
            .unwrap();

        assert_eq!(
            outputs,
            vec![
                EngineOutput::Text {
                    text: "the quick brown".to_string()
                },
                EngineOutput::Tokens {
                    output_ids: vec![7, 8]
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_infer_after_clear_fails() {
        let engine = EchoEngine::new();
        engine.clear().await.unwrap();
        let err = engine.infer(vec![input("hi", None, 1)]).await.unwrap_err();
        assert!(matches!(err, EngineError::Cleared));
    }
}
