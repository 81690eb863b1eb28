//! Loop-level streaming events.
//!
//! `AgentStreamEvent` turns observer callbacks into serializable events that
//! a host can forward to a UI, log as JSON lines, or assert on in tests.

use serde::{Deserialize, Serialize};
use thinkact_core::agent::LoopState;
use thinkact_core::observer::Observer;
use thinkact_core::tool::{ToolCallRequest, ToolOutcome};
use tokio::sync::mpsc;

/// Events emitted by the loop during a `process()` call.
///
/// - `chunk`: partial text from the model
/// - `tool_call`: the loop is invoking a tool
/// - `tool_result`: tool execution completed
/// - `state`: the loop changed state
/// - `done`: the call finished
/// - `error`: a fatal error ended the call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// Partial text token from the model.
    Chunk { content: String },

    /// The loop is calling a tool.
    ToolCall {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },

    /// Tool execution completed.
    ToolResult {
        id: String,
        name: String,
        output: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// State transition with an optional message.
    State { state: LoopState, message: String },

    /// The call is complete.
    Done {
        answer: String,
        iterations: u32,
        tool_calls_made: usize,
    },

    /// An error ended the call.
    Error { message: String },
}

impl AgentStreamEvent {
    /// Event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::State { .. } => "state",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    pub fn tool_call(call: &ToolCallRequest) -> Self {
        Self::ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: serde_json::to_value(&call.arguments).unwrap_or_default(),
        }
    }

    pub fn tool_result(call: &ToolCallRequest, outcome: &ToolOutcome) -> Self {
        Self::ToolResult {
            id: outcome.call_id.clone(),
            name: call.name.clone(),
            output: outcome.output.clone(),
            success: outcome.succeeded,
            error: outcome.error_message.clone(),
        }
    }
}

/// Observer that forwards every callback into an unbounded channel.
///
/// Events keep callback order. Sends after the receiver is dropped are
/// discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<AgentStreamEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AgentStreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit an event that has no observer callback (`done`, `error`).
    pub fn send(&self, event: AgentStreamEvent) {
        let _ = self.tx.send(event);
    }
}

impl Observer for ChannelObserver {
    fn on_token(&self, token: &str) {
        self.send(AgentStreamEvent::Chunk {
            content: token.to_string(),
        });
    }

    fn on_tool(&self, call: &ToolCallRequest, outcome: &ToolOutcome) {
        self.send(AgentStreamEvent::tool_call(call));
        self.send(AgentStreamEvent::tool_result(call, outcome));
    }

    fn on_state(&self, state: LoopState, message: &str) {
        self.send(AgentStreamEvent::State {
            state,
            message: message.to_string(),
        });
    }
}
