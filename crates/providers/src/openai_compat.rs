//! OpenAI-compatible text-completion backend.
//!
//! Works with vLLM, llama.cpp server, text-generation-inference, Ollama and
//! any server exposing `POST /v1/completions`. The loop renders the whole
//! prompt itself, so the plain completion endpoint is used rather than chat.
//!
//! Supports:
//! - Non-streaming completions
//! - Streaming completions over SSE, delivered as ordered text chunks

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thinkact_config::BackendConfig;
use thinkact_core::error::ProviderError;
use thinkact_core::provider::{GenerationRequest, ModelBackend, TokenStream};
use tracing::{debug, trace, warn};

/// Call delimiters the loop understands. A server that stops on a closing
/// tag strips it; it is restored so the parser sees whole blocks.
const CALL_DELIMITERS: [(&str, &str); 2] = [("<tool_call>", "</tool_call>"), ("<call>", "</call>")];

/// A model backend speaking the OpenAI completions protocol.
pub struct OpenAiCompatBackend {
    name: String,
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatBackend {
    /// Create a backend for `base_url` (including the version segment, e.g.
    /// `http://localhost:8000/v1`).
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: "openai-compat".into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            client: build_client(Duration::from_secs(120)),
        }
    }

    /// Create a backend from the `[backend]` config section.
    pub fn from_config(config: &BackendConfig) -> Self {
        let mut backend = Self::new(&config.base_url, &config.model)
            .with_timeout(Duration::from_secs(config.timeout_secs));
        backend.api_key = config.api_key.clone();
        backend
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_body(&self, request: &GenerationRequest, stream: bool) -> CompletionRequest {
        let config = &request.config;
        CompletionRequest {
            model: self.model.clone(),
            prompt: request.prompt.clone(),
            max_tokens: config.max_new_tokens,
            temperature: if config.do_sample {
                config.temperature
            } else {
                0.0
            },
            top_p: config.top_p,
            top_k: config.top_k,
            stop: config.stop_sequences.clone(),
            stream,
        }
    }

    async fn send(
        &self,
        request: &GenerationRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        if !request.images.is_empty() {
            warn!(
                images = request.images.len(),
                "Completion endpoint cannot carry images; sending text only"
            );
        }

        let url = format!("{}/completions", self.base_url);
        let body = self.request_body(request, stream);
        debug!(
            backend = %self.name,
            model = %self.model,
            prompt_len = request.prompt.len(),
            stream,
            "Sending completion request"
        );

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }
        if stream {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Backend returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }
        Ok(response)
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// The closing tag to restore when generation halted inside a call block.
///
/// `stop_reason` is the matched stop string when the server reports it
/// (vLLM does); otherwise any dangling block counts.
fn missing_close(text: &str, finish_reason: Option<&str>, stop_reason: Option<&str>) -> Option<&'static str> {
    if finish_reason != Some("stop") {
        return None;
    }
    CALL_DELIMITERS.iter().find_map(|&(open, close)| {
        let start = text.rfind(open)?;
        if text[start..].contains(close) {
            return None;
        }
        match stop_reason {
            Some(matched) if matched != close => None,
            _ => Some(close),
        }
    })
}

#[async_trait]
impl ModelBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError> {
        let response = self.send(&request, false).await?;

        let api_response: CompletionResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::GenerationFailed("No choices in response".into()))?;

        let mut text = choice.text;
        if let Some(close) = missing_close(
            &text,
            choice.finish_reason.as_deref(),
            choice.stop_reason.as_ref().and_then(|v| v.as_str()),
        ) {
            text.push_str(close);
        }
        Ok(text)
    }

    async fn generate_stream(&self, request: GenerationRequest) -> Result<TokenStream, ProviderError> {
        let response = self.send(&request, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let backend_name = self.name.clone();

        // Spawn task to read the SSE byte stream and forward text deltas
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            // raw bytes: a multi-byte character may straddle two chunks
            let mut buffer: Vec<u8> = Vec::new();
            let mut text = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.extend_from_slice(&bytes);

                // Process complete lines
                while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
                    let raw: Vec<u8> = buffer.drain(..=line_end).collect();
                    let line = String::from_utf8_lossy(&raw[..line_end]);

                    match parse_sse_line(line.trim_end_matches('\r')) {
                        SseLine::Skip => {}
                        SseLine::Done => return,
                        SseLine::Invalid(e) => {
                            trace!(backend = %backend_name, error = %e, "Ignoring unparseable SSE chunk");
                        }
                        SseLine::Delta(choice) => {
                            if !choice.text.is_empty() {
                                text.push_str(&choice.text);
                                if tx.send(Ok(choice.text.clone())).await.is_err() {
                                    return; // receiver dropped
                                }
                            }
                            if let Some(close) = missing_close(
                                &text,
                                choice.finish_reason.as_deref(),
                                choice.stop_reason.as_ref().and_then(|v| v.as_str()),
                            ) {
                                text.push_str(close);
                                let _ = tx.send(Ok(close.to_string())).await;
                            }
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

/// One classified SSE line.
#[derive(Debug)]
enum SseLine {
    /// Blank line, comment, or a non-data field
    Skip,
    /// `data: [DONE]`
    Done,
    Delta(CompletionChoice),
    Invalid(String),
}

fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }
    match serde_json::from_str::<CompletionResponse>(data) {
        Ok(resp) => resp
            .choices
            .into_iter()
            .next()
            .map_or(SseLine::Skip, SseLine::Delta),
        Err(e) => SseLine::Invalid(e.to_string()),
    }
}

// --- Completions API types (internal) ---

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    prompt: String,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
    #[serde(default)]
    finish_reason: Option<String>,
    /// vLLM: the matched stop string (or token id)
    #[serde(default)]
    stop_reason: Option<serde_json::Value>,
}
