//! End-to-end integration tests for the thinkact reasoning loop.
//!
//! These tests drive the real loop with the real built-in tools against a
//! scripted model backend, from user input to final answer.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use thinkact_agent::loop_runner::{ERROR_LIMIT_MARKER, ITERATION_LIMIT_MARKER};
use thinkact_agent::{AgentStreamEvent, ChannelObserver, ReasoningLoop, Termination};
use thinkact_config::ToolsConfig;
use thinkact_core::error::ProviderError;
use thinkact_core::history::ConversationHistory;
use thinkact_core::message::Role;
use thinkact_core::provider::{GenerationRequest, ModelBackend};
use thinkact_tools::default_registry;

// ── Mock Backend ─────────────────────────────────────────────────────────

/// A backend that replies with scripted responses in sequence.
///
/// Once the script runs out the last response repeats.
struct ScriptedBackend {
    responses: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            last: Mutex::new(String::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn prompt(&self, index: usize) -> String {
        self.prompts.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(request.prompt);
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.responses.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(last.clone())
    }
}

fn agent_with(backend: Arc<ScriptedBackend>) -> ReasoningLoop {
    ReasoningLoop::builder()
        .backend(backend)
        .system_prompt("You are a helpful assistant with tools.")
        .registry(default_registry(&ToolsConfig::default()))
        .build()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ── E2E: Tool Call Then Answer ───────────────────────────────────────────

#[tokio::test]
async fn e2e_list_directory_then_answer() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("alpha.txt"), "a").unwrap();
    std::fs::write(dir.path().join("beta.txt"), "b").unwrap();

    let call = format!(
        "Let me look.\n<call>\nname: list_directory\narguments:\n  path: {}\n</call>",
        path_str(dir.path())
    );
    let backend = Arc::new(ScriptedBackend::new(&[
        call.as_str(),
        "The directory has two files: alpha.txt and beta.txt.",
    ]));
    let mut agent = agent_with(backend.clone());

    let report = agent.run("What files are here?", vec![]).await.unwrap();

    assert_eq!(report.termination, Termination::Answered);
    assert_eq!(report.answer, "The directory has two files: alpha.txt and beta.txt.");
    assert_eq!(report.iterations, 2);
    assert_eq!(report.tool_calls, 1);
    assert_eq!(backend.calls(), 2);

    // the second prompt carries the listing
    let second = backend.prompt(1);
    assert!(second.contains("### list_directory (id: call_0)"));
    assert!(second.contains("Status: Success"));
    assert!(second.contains("alpha.txt"));
    assert!(second.contains("Total: 2 items"));

    let roles: Vec<Role> = agent.history().turns().iter().map(|t| t.role).collect();
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
}

#[tokio::test]
async fn e2e_direct_answer_no_tools() {
    let backend = Arc::new(ScriptedBackend::new(&["Paris is the capital of France."]));
    let mut agent = agent_with(backend.clone());

    let answer = agent.process("Capital of France?", vec![]).await.unwrap();
    assert_eq!(answer, "Paris is the capital of France.");
    assert_eq!(backend.calls(), 1);
    assert!(backend.prompt(0).contains("## Available Tools"));
    assert!(backend.prompt(0).contains("### read_file"));
}

// ── E2E: Batched Calls ───────────────────────────────────────────────────

#[tokio::test]
async fn e2e_write_then_read_in_one_batch() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("notes/todo.txt");

    let calls = format!(
        "<tool_call>\nname: write_file\narguments:\n  file_path: {p}\n  content: buy milk\n</tool_call>\n\
         <tool_call>\nname: read_file\narguments:\n  file_path: {p}\n</tool_call>",
        p = path_str(&target)
    );
    let backend = Arc::new(ScriptedBackend::new(&[calls.as_str(), "Saved your note."]));
    let mut agent = agent_with(backend.clone());

    let report = agent.run("Remember to buy milk", vec![]).await.unwrap();
    assert_eq!(report.tool_calls, 2);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "buy milk");

    // both outcomes land in a single tool-result turn
    let tool_turns: Vec<_> = agent
        .history()
        .turns()
        .iter()
        .filter(|t| t.role == Role::ToolResult)
        .collect();
    assert_eq!(tool_turns.len(), 1);
    assert!(tool_turns[0].text.contains("### write_file (id: call_0)"));
    assert!(tool_turns[0].text.contains("### read_file (id: call_1)"));
    assert!(tool_turns[0].text.contains("     1\tbuy milk"));
}

// ── E2E: Failure Handling ────────────────────────────────────────────────

#[tokio::test]
async fn e2e_unknown_tool_is_reported_to_model() {
    let backend = Arc::new(ScriptedBackend::new(&[
        "<tool_call>\nname: teleport\narguments:\n  to: mars\n</tool_call>",
        "I cannot teleport, sorry.",
    ]));
    let mut agent = agent_with(backend.clone());

    let report = agent.run("Take me to Mars", vec![]).await.unwrap();
    assert_eq!(report.termination, Termination::Answered);
    assert_eq!(report.answer, "I cannot teleport, sorry.");

    let second = backend.prompt(1);
    assert!(second.contains("Status: Failed"));
    assert!(second.contains("Error: Unknown tool: teleport"));
}

#[tokio::test]
async fn e2e_consecutive_errors_stop_the_loop() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist.txt");
    let call = format!(
        "Trying again.\n<tool_call>\nname: read_file\narguments:\n  file_path: {}\n</tool_call>",
        path_str(&missing)
    );
    // the same failing call forever
    let backend = Arc::new(ScriptedBackend::new(&[call.as_str()]));
    let mut agent = agent_with(backend.clone());

    let report = agent.run("Read that file", vec![]).await.unwrap();
    assert_eq!(report.termination, Termination::ErrorLimit);
    assert_eq!(report.tool_calls, 3);
    assert_eq!(backend.calls(), 3);
    assert!(report.answer.starts_with("Trying again."));
    assert!(report.answer.contains("Too many consecutive errors. Stopping."));
    assert!(report.answer.contains("File not found: "));
    assert!(report.answer.ends_with(ERROR_LIMIT_MARKER));
}

#[tokio::test]
async fn e2e_iteration_limit() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.txt");
    let call = format!(
        "Working on it.\n<tool_call>\nname: write_file\narguments:\n  file_path: {}\n  content: step\n</tool_call>",
        path_str(&target)
    );
    let backend = Arc::new(ScriptedBackend::new(&[call.as_str()]));
    let mut agent = ReasoningLoop::builder()
        .backend(backend.clone())
        .max_iterations(1)
        .registry(default_registry(&ToolsConfig::default()))
        .build();

    let report = agent.run("Do the task", vec![]).await.unwrap();
    assert_eq!(report.termination, Termination::IterationLimit);
    assert_eq!(backend.calls(), 1);
    assert!(target.exists());
    assert_eq!(report.answer, format!("Working on it.\n\n{ITERATION_LIMIT_MARKER}"));
}

// ── E2E: Streaming Events ────────────────────────────────────────────────

#[tokio::test]
async fn e2e_channel_observer_sees_every_step() {
    let dir = tempfile::tempdir().unwrap();
    let call = format!(
        "<tool_call>\nname: list_directory\narguments:\n  path: {}\n</tool_call>",
        path_str(dir.path())
    );
    let backend = Arc::new(ScriptedBackend::new(&[call.as_str(), "Empty directory."]));
    let (observer, mut rx) = ChannelObserver::new();
    let mut agent = ReasoningLoop::builder()
        .backend(backend)
        .registry(default_registry(&ToolsConfig::default()))
        .observer(Arc::new(observer))
        .build();

    agent.process("List it", vec![]).await.unwrap();
    drop(agent);

    let mut kinds = Vec::new();
    while let Some(event) = rx.recv().await {
        if let AgentStreamEvent::ToolResult { success, output, .. } = &event {
            assert!(*success);
            assert!(output.ends_with("Total: 0 items"));
        }
        kinds.push(event.event_type());
    }

    let first_call = kinds.iter().position(|k| *k == "tool_call").unwrap();
    assert_eq!(kinds[first_call + 1], "tool_result");
    assert!(kinds[..first_call].contains(&"chunk"));
    assert_eq!(kinds.last(), Some(&"state"));
}

// ── E2E: History Persistence ─────────────────────────────────────────────

#[tokio::test]
async fn e2e_history_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let saved = dir.path().join("session.hist");

    let first = Arc::new(ScriptedBackend::new(&["Nice to meet you, Ada."]));
    let mut agent = agent_with(first);
    agent.process("My name is Ada.", vec![]).await.unwrap();
    agent.history().save(&saved).unwrap();

    let restored = ConversationHistory::load(&saved, 16_000).unwrap();
    assert_eq!(restored.turns(), agent.history().turns());

    let second = Arc::new(ScriptedBackend::new(&["Your name is Ada."]));
    let mut resumed = agent_with(second.clone());
    resumed.replace_history(restored);
    let answer = resumed.process("What is my name?", vec![]).await.unwrap();

    assert_eq!(answer, "Your name is Ada.");
    let prompt = second.prompt(0);
    assert!(prompt.contains("My name is Ada."));
    assert!(prompt.contains("Nice to meet you, Ada."));
    assert_eq!(resumed.history().len(), 5);
}
