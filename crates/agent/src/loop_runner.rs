//! The reasoning loop implementation.

use std::sync::Arc;
use std::time::Instant;

use thinkact_core::agent::{AgentConfig, LoopControl, LoopHandle, LoopState};
use thinkact_core::error::{Error, ProviderError};
use thinkact_core::history::ConversationHistory;
use thinkact_core::message::Turn;
use thinkact_core::observer::Observer;
use thinkact_core::provider::{GenerationConfig, GenerationRequest, ModelBackend};
use thinkact_core::tool::{Tool, ToolCallRequest, ToolOutcome, ToolRegistry};
use tracing::{debug, info, warn};

use crate::parser::{parse_tool_calls, strip_tool_calls};
use crate::prompt::{build_prompt, format_tool_results, prompt_images};

/// Appended when the iteration ceiling ends a call.
pub const ITERATION_LIMIT_MARKER: &str = "[iteration limit reached]";

/// Appended when the consecutive-error threshold ends a call.
pub const ERROR_LIMIT_MARKER: &str = "[consecutive error limit reached]";

/// Why a `run()` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The model replied without tool calls.
    Answered,
    /// A stop was requested.
    Stopped,
    /// `max_iterations` model calls were made without an answer.
    IterationLimit,
    /// `max_consecutive_errors` tool failures in a row.
    ErrorLimit,
}

/// Result of one `run()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopReport {
    pub answer: String,
    pub termination: Termination,
    /// Model calls made
    pub iterations: u32,
    /// Tool calls dispatched
    pub tool_calls: usize,
}

/// Drives a model through think/act cycles until it answers.
///
/// One instance handles one `process()` at a time. History persists across
/// calls; [`ReasoningLoop::reset`] clears it.
pub struct ReasoningLoop {
    /// The model backend to use
    backend: Option<Arc<dyn ModelBackend>>,

    /// Tool registry
    tools: ToolRegistry,

    /// Conversation log with the pinned system prompt
    history: ConversationHistory,

    config: AgentConfig,

    generation: GenerationConfig,

    /// Optional progress sink
    observer: Option<Arc<dyn Observer>>,

    /// Stop flag and state, shared with handles
    control: Arc<LoopControl>,
}

impl ReasoningLoop {
    /// Create a loop with the given configuration and no backend or tools.
    pub fn new(config: AgentConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> ReasoningLoopBuilder {
        ReasoningLoopBuilder::default()
    }

    /// A handle for stopping and inspecting this loop from another task.
    pub fn handle(&self) -> LoopHandle {
        LoopHandle::new(self.control.clone())
    }

    /// Request a stop at the next checkpoint.
    pub fn stop(&self) {
        self.control.request_stop();
    }

    pub fn state(&self) -> LoopState {
        self.control.state()
    }

    pub fn is_busy(&self) -> bool {
        self.handle().is_busy()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolRegistry {
        &mut self.tools
    }

    pub fn set_backend(&mut self, backend: Arc<dyn ModelBackend>) {
        self.backend = Some(backend);
    }

    pub fn set_observer(&mut self, observer: Arc<dyn Observer>) {
        self.observer = Some(observer);
    }

    /// Replace the history (e.g. after loading a saved session).
    ///
    /// A history without a pinned system turn gets the configured prompt,
    /// and the configured budget applies from the next append.
    pub fn replace_history(&mut self, mut history: ConversationHistory) {
        if history.pinned().is_none() {
            history.set_system(self.config.system_prompt.clone());
        }
        history.set_budget(self.config.context_budget);
        self.history = history;
    }

    /// Clear history except the system prompt, clear a pending stop, and tell
    /// the backend to drop per-session state.
    pub fn reset(&mut self) {
        self.history.clear();
        self.control.take_stop();
        self.set_state(LoopState::Idle, "reset");
        if let Some(backend) = &self.backend {
            backend.start_chat();
        }
        debug!("Conversation reset");
    }

    /// Process a user message and return the answer text.
    pub async fn process(&mut self, message: &str, images: Vec<String>) -> Result<String, Error> {
        self.run(message, images).await.map(|report| report.answer)
    }

    /// Process a user message and report how the call ended.
    ///
    /// Fails only when no backend is configured or the backend faults; tool
    /// failures and limits produce an answer instead.
    pub async fn run(&mut self, message: &str, images: Vec<String>) -> Result<LoopReport, Error> {
        let backend = self.backend.clone().ok_or(ProviderError::NotConfigured)?;

        info!(
            backend = backend.name(),
            turns = self.history.len(),
            images = images.len(),
            "Processing message"
        );

        self.history.append(Turn::user_with_images(message, images));
        self.set_state(LoopState::Thinking, "");

        let mut iterations = 0u32;
        let mut tool_calls = 0usize;
        let mut consecutive_errors = 0u32;
        let mut last_error = String::new();
        let mut response = String::new();

        let termination = loop {
            if self.control.is_stop_requested() {
                info!(iterations, "Stop requested");
                break Termination::Stopped;
            }
            if iterations >= self.config.max_iterations {
                warn!(iterations, "Max iterations reached without an answer");
                break Termination::IterationLimit;
            }
            iterations += 1;
            debug!(iteration = iterations, "Loop iteration");

            response = match self.generate(backend.as_ref()).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, iteration = iterations, "Model generation failed");
                    self.control.take_stop();
                    self.set_state(LoopState::Errored, &e.to_string());
                    return Err(e.into());
                }
            };
            self.history.append(Turn::assistant(response.clone()));

            let calls = parse_tool_calls(&response);
            if calls.is_empty() {
                break Termination::Answered;
            }

            self.set_state(
                LoopState::CallingTool,
                &format!("{} tool call(s)", calls.len()),
            );

            let mut results: Vec<(ToolCallRequest, ToolOutcome)> = Vec::with_capacity(calls.len());
            let mut limit_hit = false;
            for call in calls {
                if self.control.is_stop_requested() {
                    break;
                }
                let waits = self.tools.needs_user_input(&call.name);
                if waits {
                    self.set_state(LoopState::WaitingForUser, &call.name);
                }
                let outcome = self.tools.dispatch(&call).await;
                if waits {
                    self.set_state(LoopState::CallingTool, "");
                }
                tool_calls += 1;
                if let Some(observer) = &self.observer {
                    observer.on_tool(&call, &outcome);
                }

                if outcome.succeeded {
                    consecutive_errors = 0;
                } else {
                    consecutive_errors += 1;
                    last_error = outcome.error().to_string();
                    limit_hit = consecutive_errors >= self.config.max_consecutive_errors;
                }
                results.push((call, outcome));
                if limit_hit {
                    break;
                }
            }

            if !results.is_empty() {
                let ids = results
                    .iter()
                    .map(|(call, _)| call.id.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                self.history
                    .append(Turn::tool_result("tools", ids, format_tool_results(&results)));
            }

            if limit_hit {
                warn!(
                    consecutive_errors,
                    last_error = %last_error,
                    "Too many consecutive tool errors"
                );
                self.set_state(LoopState::Errored, &last_error);
                break Termination::ErrorLimit;
            }

            self.set_state(LoopState::Thinking, "");
        };

        let answer = match termination {
            Termination::Answered => response,
            Termination::Stopped => strip_tool_calls(&response),
            Termination::IterationLimit => {
                append_marker(strip_tool_calls(&response), ITERATION_LIMIT_MARKER)
            }
            Termination::ErrorLimit => append_marker(
                strip_tool_calls(&response),
                &format!(
                    "Too many consecutive errors. Stopping.\nLast error: {last_error}\n{ERROR_LIMIT_MARKER}"
                ),
            ),
        };

        self.control.take_stop();
        self.set_state(LoopState::Done, "");
        info!(
            iterations,
            tool_calls,
            termination = ?termination,
            answer_len = answer.len(),
            "Processing complete"
        );

        Ok(LoopReport {
            answer,
            termination,
            iterations,
            tool_calls,
        })
    }

    /// One model call over the current history.
    async fn generate(&self, backend: &dyn ModelBackend) -> Result<String, ProviderError> {
        let prompt = build_prompt(&self.history, &self.tools.render_catalog());
        let request = GenerationRequest::new(prompt, self.generation.clone())
            .with_images(prompt_images(&self.history));

        let start = Instant::now();
        let text = if self.config.stream_output {
            let mut rx = backend.generate_stream(request).await?;
            let mut text = String::new();
            while let Some(chunk) = rx.recv().await {
                let chunk = chunk?;
                if let Some(observer) = &self.observer {
                    observer.on_token(&chunk);
                }
                text.push_str(&chunk);
            }
            text
        } else {
            backend.generate(request).await?
        };

        debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            response_len = text.len(),
            streamed = self.config.stream_output,
            "Model call complete"
        );
        Ok(text)
    }

    fn set_state(&self, state: LoopState, message: &str) {
        self.control.set_state(state);
        if let Some(observer) = &self.observer {
            observer.on_state(state, message);
        }
    }
}

fn append_marker(narrative: String, marker: &str) -> String {
    if narrative.is_empty() {
        marker.to_string()
    } else {
        format!("{narrative}\n\n{marker}")
    }
}

/// Builder for [`ReasoningLoop`].
#[derive(Default)]
pub struct ReasoningLoopBuilder {
    backend: Option<Arc<dyn ModelBackend>>,
    tools: ToolRegistry,
    config: AgentConfig,
    generation: GenerationConfig,
    observer: Option<Arc<dyn Observer>>,
}

impl ReasoningLoopBuilder {
    pub fn backend(mut self, backend: Arc<dyn ModelBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Replace the whole loop configuration.
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    /// Set the maximum number of model calls per `process()`.
    pub fn max_iterations(mut self, max: u32) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn max_consecutive_errors(mut self, max: u32) -> Self {
        self.config.max_consecutive_errors = max;
        self
    }

    pub fn context_budget(mut self, budget: usize) -> Self {
        self.config.context_budget = budget;
        self
    }

    /// Consume the backend as a token stream (default) or whole.
    pub fn streaming(mut self, enabled: bool) -> Self {
        self.config.stream_output = enabled;
        self
    }

    pub fn generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Register one tool.
    pub fn tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.register(Box::new(tool));
        self
    }

    /// Use a prepared registry, replacing tools added so far.
    pub fn registry(mut self, registry: ToolRegistry) -> Self {
        self.tools = registry;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> ReasoningLoop {
        let history =
            ConversationHistory::with_system(self.config.system_prompt.clone(), self.config.context_budget);
        ReasoningLoop {
            backend: self.backend,
            tools: self.tools,
            history,
            config: self.config,
            generation: self.generation,
            observer: self.observer,
            control: Arc::new(LoopControl::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedBackend;
    use async_trait::async_trait;
    use std::sync::{Mutex, OnceLock};
    use thinkact_core::error::ToolError;
    use thinkact_core::message::Role;
    use thinkact_core::observer::FnObserver;
    use thinkact_core::tool::{ParamKind, ToolArguments, ToolParameter, ToolSchema};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "echo".into(),
                description: "Echoes back the input".into(),
                parameters: vec![ToolParameter::required("text", ParamKind::String, "Text")],
            }
        }

        async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutcome, ToolError> {
            match arguments.get("text") {
                Some(text) => Ok(ToolOutcome::success(text.clone())),
                None => Err(ToolError::InvalidArguments("text is required".into())),
            }
        }
    }

    /// Requests a stop on the loop it is registered in.
    struct StopTool {
        handle: Arc<OnceLock<LoopHandle>>,
    }

    #[async_trait]
    impl Tool for StopTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "halt".into(),
                description: "Stops the loop".into(),
                parameters: vec![],
            }
        }

        async fn execute(&self, _arguments: &ToolArguments) -> Result<ToolOutcome, ToolError> {
            if let Some(handle) = self.handle.get() {
                handle.stop();
            }
            Ok(ToolOutcome::success("stopping"))
        }
    }

    fn call(name: &str, args: &str) -> String {
        format!("<tool_call>\nname: {name}\narguments:\n{args}</tool_call>")
    }

    fn looped(backend: Arc<ScriptedBackend>) -> ReasoningLoop {
        ReasoningLoop::builder()
            .backend(backend)
            .system_prompt("You are a test agent.")
            .tool(EchoTool)
            .build()
    }

    #[tokio::test]
    async fn simple_text_response() {
        let backend = Arc::new(ScriptedBackend::texts(&["Hello! How can I help?"]));
        let mut agent = looped(backend.clone());

        let report = agent.run("Hello!", vec![]).await.unwrap();
        assert_eq!(report.answer, "Hello! How can I help?");
        assert_eq!(report.termination, Termination::Answered);
        assert_eq!(report.iterations, 1);
        assert_eq!(report.tool_calls, 0);
        // System + User + Assistant
        assert_eq!(agent.history().len(), 3);
        assert_eq!(agent.state(), LoopState::Done);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn tool_call_then_answer() {
        let backend = Arc::new(ScriptedBackend::texts(&[
            call("echo", "  text: ping\n").as_str(),
            "The tool said ping.",
        ]));
        let mut agent = looped(backend.clone());

        let report = agent.run("echo ping", vec![]).await.unwrap();
        assert_eq!(report.answer, "The tool said ping.");
        assert_eq!(report.iterations, 2);
        assert_eq!(report.tool_calls, 1);

        let roles: Vec<_> = agent.history().turns().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            [
                Role::System,
                Role::User,
                Role::Assistant,
                Role::ToolResult,
                Role::Assistant
            ]
        );
        let result = &agent.history().turns()[3];
        assert_eq!(result.call_id.as_deref(), Some("call_0"));
        assert!(result.text.contains("### echo (id: call_0)\nStatus: Success\nOutput:\nping"));

        let second_prompt = &backend.requests()[1].prompt;
        assert!(second_prompt.contains("<|im_start|>tool\nTool Results:"));
        assert!(second_prompt.contains("### echo"));
    }

    #[tokio::test]
    async fn missing_backend_is_fatal() {
        let mut agent = ReasoningLoop::new(AgentConfig::default());
        let err = agent.process("hi", vec![]).await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::NotConfigured)));
        // system prompt only; nothing appended
        assert_eq!(agent.history().len(), 1);
    }

    #[tokio::test]
    async fn backend_failure_is_fatal() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(
            ProviderError::ModelNotLoaded("weights missing".into()),
        )]));
        let mut agent = looped(backend);
        let err = agent.process("hi", vec![]).await.unwrap_err();
        assert!(err.to_string().contains("weights missing"));
        assert_eq!(agent.state(), LoopState::Errored);
    }

    #[tokio::test]
    async fn consecutive_errors_stop_before_fourth_call() {
        let response = (0..5)
            .map(|i| call(&format!("missing_{i}"), ""))
            .collect::<Vec<_>>()
            .join("\n");
        let backend = Arc::new(ScriptedBackend::texts(&[response.as_str()]));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();

        let mut agent = ReasoningLoop::builder()
            .backend(backend.clone())
            .max_consecutive_errors(3)
            .observer(Arc::new(
                FnObserver::new().on_tool(move |call, _| s.lock().unwrap().push(call.name.clone())),
            ))
            .build();

        let report = agent.run("go", vec![]).await.unwrap();
        assert_eq!(report.termination, Termination::ErrorLimit);
        assert_eq!(report.tool_calls, 3);
        assert_eq!(*seen.lock().unwrap(), ["missing_0", "missing_1", "missing_2"]);
        assert!(report.answer.contains("Too many consecutive errors. Stopping."));
        assert!(report.answer.contains("Last error: Unknown tool: missing_2"));
        assert!(report.answer.ends_with(ERROR_LIMIT_MARKER));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn success_resets_error_counter() {
        let response = [
            call("nope", ""),
            call("nope", ""),
            call("echo", "  text: ok\n"),
            call("nope", ""),
            call("nope", ""),
        ]
        .join("\n");
        let backend = Arc::new(ScriptedBackend::texts(&[response.as_str(), "done"]));
        let mut agent = ReasoningLoop::builder()
            .backend(backend)
            .max_consecutive_errors(3)
            .tool(EchoTool)
            .build();

        let report = agent.run("go", vec![]).await.unwrap();
        assert_eq!(report.termination, Termination::Answered);
        assert_eq!(report.tool_calls, 5);
        assert_eq!(report.answer, "done");
    }

    #[tokio::test]
    async fn iteration_limit_appends_marker() {
        let backend = Arc::new(ScriptedBackend::texts(&[format!(
            "Working on it.\n{}",
            call("echo", "  text: again\n")
        )
        .as_str()]));
        let mut agent = ReasoningLoop::builder()
            .backend(backend.clone())
            .max_iterations(1)
            .tool(EchoTool)
            .build();

        let report = agent.run("loop forever", vec![]).await.unwrap();
        assert_eq!(report.termination, Termination::IterationLimit);
        assert_eq!(report.iterations, 1);
        assert_eq!(backend.call_count(), 1);
        assert_eq!(report.answer, format!("Working on it.\n\n{ITERATION_LIMIT_MARKER}"));
    }

    #[tokio::test]
    async fn stop_before_process_makes_no_model_call() {
        let backend = Arc::new(ScriptedBackend::texts(&["answer"]));
        let mut agent = looped(backend.clone());

        agent.handle().stop();
        let report = agent.run("hi", vec![]).await.unwrap();
        assert_eq!(report.termination, Termination::Stopped);
        assert_eq!(backend.call_count(), 0);

        // the stop was consumed
        let report = agent.run("hi again", vec![]).await.unwrap();
        assert_eq!(report.termination, Termination::Answered);
        assert_eq!(report.answer, "answer");
    }

    #[tokio::test]
    async fn stop_is_checked_before_each_dispatch() {
        let slot = Arc::new(OnceLock::new());
        let response = format!(
            "Halting.\n{}\n{}",
            call("halt", ""),
            call("echo", "  text: never\n")
        );
        let backend = Arc::new(ScriptedBackend::texts(&[response.as_str(), "unreachable"]));
        let mut agent = ReasoningLoop::builder()
            .backend(backend.clone())
            .tool(EchoTool)
            .tool(StopTool {
                handle: slot.clone(),
            })
            .build();
        let _ = slot.set(agent.handle());

        let report = agent.run("stop please", vec![]).await.unwrap();
        assert_eq!(report.termination, Termination::Stopped);
        assert_eq!(report.tool_calls, 1);
        assert_eq!(report.answer, "Halting.");
        assert_eq!(backend.call_count(), 1);
        // the halt result is still recorded
        assert_eq!(
            agent.history().turns().last().map(|t| t.role),
            Some(Role::ToolResult)
        );
        assert!(!agent.handle().is_stop_requested());
    }

    #[tokio::test]
    async fn streamed_tokens_arrive_in_order() {
        let text = "line one\nline two\nline three";
        let backend = Arc::new(ScriptedBackend::texts(&[text]));
        let tokens = Arc::new(Mutex::new(Vec::new()));
        let t = tokens.clone();

        let mut agent = ReasoningLoop::builder()
            .backend(backend)
            .observer(Arc::new(
                FnObserver::new().on_token(move |tok| t.lock().unwrap().push(tok.to_string())),
            ))
            .build();

        let answer = agent.process("go", vec![]).await.unwrap();
        assert_eq!(answer, text);
        let tokens = tokens.lock().unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens.concat(), text);
    }

    #[tokio::test]
    async fn non_streaming_emits_no_tokens() {
        let backend = Arc::new(ScriptedBackend::texts(&["whole"]));
        let tokens = Arc::new(Mutex::new(0usize));
        let t = tokens.clone();

        let mut agent = ReasoningLoop::builder()
            .backend(backend)
            .streaming(false)
            .observer(Arc::new(FnObserver::new().on_token(move |_| *t.lock().unwrap() += 1)))
            .build();

        assert_eq!(agent.process("go", vec![]).await.unwrap(), "whole");
        assert_eq!(*tokens.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn state_transitions_are_observed() {
        let backend = Arc::new(ScriptedBackend::texts(&[call("echo", "  text: x\n").as_str(), "done"]));
        let states = Arc::new(Mutex::new(Vec::new()));
        let s = states.clone();

        let mut agent = ReasoningLoop::builder()
            .backend(backend)
            .tool(EchoTool)
            .observer(Arc::new(
                FnObserver::new().on_state(move |state, _| s.lock().unwrap().push(state)),
            ))
            .build();
        agent.process("go", vec![]).await.unwrap();

        assert_eq!(
            *states.lock().unwrap(),
            [
                LoopState::Thinking,
                LoopState::CallingTool,
                LoopState::Thinking,
                LoopState::Done
            ]
        );
    }

    #[tokio::test]
    async fn interactive_tool_reports_waiting_for_user() {
        struct Confirm;

        #[async_trait]
        impl Tool for Confirm {
            fn schema(&self) -> ToolSchema {
                ToolSchema {
                    name: "confirm".into(),
                    description: "Asks a human".into(),
                    parameters: vec![],
                }
            }

            fn needs_user_input(&self) -> bool {
                true
            }

            async fn execute(&self, _arguments: &ToolArguments) -> Result<ToolOutcome, ToolError> {
                Ok(ToolOutcome::success("yes"))
            }
        }

        let backend = Arc::new(ScriptedBackend::texts(&[call("confirm", "").as_str(), "done"]));
        let states = Arc::new(Mutex::new(Vec::new()));
        let s = states.clone();

        let mut agent = ReasoningLoop::builder()
            .backend(backend)
            .tool(Confirm)
            .observer(Arc::new(
                FnObserver::new().on_state(move |state, _| s.lock().unwrap().push(state)),
            ))
            .build();
        agent.process("go", vec![]).await.unwrap();

        assert_eq!(
            *states.lock().unwrap(),
            [
                LoopState::Thinking,
                LoopState::CallingTool,
                LoopState::WaitingForUser,
                LoopState::CallingTool,
                LoopState::Thinking,
                LoopState::Done
            ]
        );
    }

    #[tokio::test]
    async fn history_persists_across_calls_until_reset() {
        let backend = Arc::new(ScriptedBackend::texts(&["first", "second"]));
        let mut agent = looped(backend.clone());

        agent.process("one", vec![]).await.unwrap();
        agent.process("two", vec![]).await.unwrap();
        assert_eq!(agent.history().len(), 5);
        assert!(backend.requests()[1].prompt.contains("<|im_start|>user\none<|im_end|>"));

        agent.stop();
        agent.reset();
        assert_eq!(agent.history().len(), 1);
        assert_eq!(agent.history().turns()[0].role, Role::System);
        assert_eq!(agent.state(), LoopState::Idle);
        assert!(!agent.handle().is_stop_requested());
        assert_eq!(backend.reset_count(), 1);
    }

    #[tokio::test]
    async fn images_reach_the_backend() {
        let backend = Arc::new(ScriptedBackend::texts(&["a cat"]));
        let mut agent = looped(backend.clone());

        agent
            .process("what is this?", vec!["cat.png".into()])
            .await
            .unwrap();
        let request = &backend.requests()[0];
        assert_eq!(request.images, vec!["cat.png"]);
        assert!(request.prompt.contains("<|vision_start|><|image_pad|><|vision_end|>what is this?"));
    }

    #[tokio::test]
    async fn replace_history_restores_system_prompt() {
        let backend = Arc::new(ScriptedBackend::texts(&["ok"]));
        let mut agent = looped(backend);

        let mut loaded = ConversationHistory::new(10);
        loaded.append(Turn::user("earlier"));
        agent.replace_history(loaded);

        assert_eq!(agent.history().turns()[0].text, "You are a test agent.");
        assert_eq!(agent.history().budget(), agent.config().context_budget);
        assert_eq!(agent.history().len(), 2);
    }
}
