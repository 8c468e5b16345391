//! Text-completion model invocation.
//!
//! The agent only ever needs "prompt in, text out". [`ModelInvoker`] is that
//! seam; [`BedrockInvoker`] is the production implementation.

mod bedrock;
mod sigv4;

pub use bedrock::BedrockInvoker;
pub use sigv4::{AwsCredentials, BedrockAuth};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sampling parameters for one generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 5000,
        }
    }
}

/// Request/response body shape of the hosted model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    /// Meta Llama: `{prompt, temperature, max_gen_len}` → `{generation}`.
    #[default]
    Llama,
    /// Mistral: `{prompt, temperature, max_tokens}` → `{outputs: [{text}]}`.
    /// Kept for older deployments.
    Mistral,
}

impl std::str::FromStr for ModelFamily {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "llama" | "meta" => Ok(ModelFamily::Llama),
            "mistral" => Ok(ModelFamily::Mistral),
            _ => Err(format!("Unknown model family: {}", s)),
        }
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelFamily::Llama => write!(f, "llama"),
            ModelFamily::Mistral => write!(f, "mistral"),
        }
    }
}

/// Anything that turns a prompt into generated text.
///
/// Failures are typed: [`SvarError::ModelTransport`](crate::SvarError::ModelTransport)
/// when the endpoint could not be reached, [`SvarError::ModelResponse`](crate::SvarError::ModelResponse)
/// when it answered in an unknown shape. An empty generation is `Ok("")`.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;

    /// Human-readable model name for logs and output.
    fn name(&self) -> &str;
}
