//! Generation request settings and their validation

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Sampling settings for one generation, already validated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Upper bound on generated tokens
    pub max_tokens: usize,

    /// Restrict sampling to the k most likely tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,

    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl SamplingParams {
    /// Params with only a token budget; the engine picks its own sampling defaults
    pub fn with_max_tokens(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            top_k: None,
            top_p: None,
            temperature: None,
        }
    }
}

/// A prompt plus its sampling settings, ready for submission
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub prompt: String,
    pub params: SamplingParams,
}

/// Body of `POST /generation`.
///
/// Numbers are parsed wide so that out-of-range values are reported by
/// [`GenerationRequest::validate`] rather than by the JSON decoder.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: i64,
    #[serde(default)]
    pub top_k: Option<i64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

impl GenerationRequest {
    /// Check every bound and convert into a [`Submission`].
    pub fn validate(self) -> Result<Submission, ValidationError> {
        if self.prompt.is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }
        if self.max_tokens <= 0 {
            return Err(ValidationError::MaxTokens(self.max_tokens));
        }
        let max_tokens =
            usize::try_from(self.max_tokens).map_err(|_| ValidationError::MaxTokens(self.max_tokens))?;

        let top_k = match self.top_k {
            Some(k) if k <= 0 => return Err(ValidationError::TopK(k)),
            Some(k) => Some(usize::try_from(k).map_err(|_| ValidationError::TopK(k))?),
            None => None,
        };

        let top_p = match self.top_p {
            Some(p) => Some(narrow_to_open_unit_interval(p).ok_or(ValidationError::TopP(p))?),
            None => None,
        };

        let temperature = match self.temperature {
            Some(t) => {
                Some(narrow_to_open_unit_interval(t).ok_or(ValidationError::Temperature(t))?)
            }
            None => None,
        };

        Ok(Submission {
            prompt: self.prompt,
            params: SamplingParams {
                max_tokens,
                top_k,
                top_p,
                temperature,
            },
        })
    }
}

/// `x` as the `f32` the engine receives, if that value lies in `0 < x < 1`.
///
/// The bound is checked after narrowing: values such as `0.99999999999`
/// round to `1.0` and `1e-50` to `0.0`. NaN is outside.
fn narrow_to_open_unit_interval(x: f64) -> Option<f32> {
    let narrowed = x as f32;
    (narrowed > 0.0 && narrowed < 1.0).then_some(narrowed)
}
