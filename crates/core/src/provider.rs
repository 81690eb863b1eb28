//! Model backend trait: the abstraction over generative models.
//!
//! A backend receives a fully rendered prompt (plus optional image
//! references) and returns generated text, either complete or as a stream
//! of text chunks. Chunks arrive in order; the loop concatenates them.
//!
//! Implementations: OpenAI-compatible completion endpoints, scripted test
//! backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Sampling and stopping parameters passed to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Maximum tokens to generate per call
    pub max_new_tokens: u32,

    /// Temperature (0.0 = deterministic)
    pub temperature: f32,

    pub top_p: f32,

    pub top_k: u32,

    /// When false, decoding is greedy
    pub do_sample: bool,

    /// Generation halts when any of these appears
    pub stop_sequences: Vec<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 2048,
            temperature: 0.7,
            top_p: 0.9,
            top_k: 50,
            do_sample: true,
            stop_sequences: vec![
                "</tool_call>".into(),
                "</call>".into(),
                "\nUser:".into(),
                "\nHuman:".into(),
            ],
        }
    }
}

/// One generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The complete rendered prompt
    pub prompt: String,

    /// Image references attached to the conversation, in turn order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    pub config: GenerationConfig,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, config: GenerationConfig) -> Self {
        Self {
            prompt: prompt.into(),
            images: Vec::new(),
            config,
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }
}

/// Ordered stream of generated text chunks.
pub type TokenStream = tokio::sync::mpsc::Receiver<Result<String, ProviderError>>;

/// The core ModelBackend trait.
///
/// The reasoning loop calls `generate()` or `generate_stream()` without
/// knowing which backend is in use.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// A human-readable name for this backend (e.g., "openai-compat").
    fn name(&self) -> &str;

    /// Generate a complete response.
    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError>;

    /// Generate a response as a stream of text chunks.
    ///
    /// Default implementation calls `generate()` and yields the whole text as
    /// a single chunk.
    async fn generate_stream(&self, request: GenerationRequest) -> Result<TokenStream, ProviderError> {
        let text = self.generate(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx.send(Ok(text)).await;
        Ok(rx)
    }

    /// Called when the conversation is reset. Backends holding per-session
    /// state (KV caches, chat sessions) discard it here.
    fn start_chat(&self) {}
}
