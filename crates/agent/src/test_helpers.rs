//! Shared test helpers for loop tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use thinkact_core::error::ProviderError;
use thinkact_core::provider::{GenerationRequest, ModelBackend, TokenStream};

/// A backend that returns a sequence of scripted responses.
///
/// Each call returns the next response in the queue. Once the queue is
/// exhausted the last response repeats, so "always calls a tool" scripts
/// need a single entry.
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    last: Mutex<Option<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<GenerationRequest>>,
    resets: Mutex<usize>,
}

impl ScriptedBackend {
    pub fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
            resets: Mutex::new(0),
        }
    }

    /// Backend whose every response is text.
    pub fn texts(responses: &[&str]) -> Self {
        Self::new(responses.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn reset_count(&self) -> usize {
        *self.resets.lock().unwrap()
    }

    fn next(&self, request: GenerationRequest) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(request);
        let mut queue = self.responses.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if let Some(response) = queue.pop_front() {
            *last = Some(response.clone());
            response
        } else {
            last.clone()
                .unwrap_or_else(|| Err(ProviderError::GenerationFailed("script exhausted".into())))
        }
    }
}

#[async_trait::async_trait]
impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError> {
        self.next(request)
    }

    /// Streams the response one line at a time.
    async fn generate_stream(&self, request: GenerationRequest) -> Result<TokenStream, ProviderError> {
        let text = self.next(request)?;
        let chunks: Vec<String> = text.split_inclusive('\n').map(str::to_string).collect();
        let (tx, rx) = tokio::sync::mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            let _ = tx.send(Ok(chunk)).await;
        }
        Ok(rx)
    }

    fn start_chat(&self) {
        *self.resets.lock().unwrap() += 1;
    }
}
