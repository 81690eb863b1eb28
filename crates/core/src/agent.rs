//! Loop configuration and state types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::history::DEFAULT_BUDGET;

/// Configuration for the reasoning loop's behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Pinned system prompt; the tool catalog is appended when rendering
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Maximum model calls per `process()` (safety limit)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Consecutive failed tool outcomes before the loop gives up
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,

    /// History budget in estimated tokens
    #[serde(default = "default_context_budget")]
    pub context_budget: usize,

    /// Consume the backend as a token stream
    #[serde(default = "default_true")]
    pub stream_output: bool,
}

fn default_system_prompt() -> String {
    "You are a helpful assistant that can think step by step and use tools to accomplish tasks. \
     When you need information or want to act, call a tool. When you have the final answer, \
     reply without any tool call."
        .into()
}
fn default_max_iterations() -> u32 {
    50
}
fn default_max_consecutive_errors() -> u32 {
    3
}
fn default_context_budget() -> usize {
    DEFAULT_BUDGET
}
fn default_true() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_iterations: default_max_iterations(),
            max_consecutive_errors: default_max_consecutive_errors(),
            context_budget: default_context_budget(),
            stream_output: default_true(),
        }
    }
}

/// Observable lifecycle state of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LoopState {
    #[default]
    Idle = 0,
    Thinking = 1,
    CallingTool = 2,
    WaitingForUser = 3,
    Errored = 4,
    Done = 5,
}

impl LoopState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Thinking,
            2 => Self::CallingTool,
            3 => Self::WaitingForUser,
            4 => Self::Errored,
            5 => Self::Done,
            _ => Self::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Thinking => "thinking",
            Self::CallingTool => "calling_tool",
            Self::WaitingForUser => "waiting_for_user",
            Self::Errored => "error",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared control block between a running loop and its handles.
#[derive(Debug, Default)]
pub struct LoopControl {
    stop: AtomicBool,
    state: AtomicU8,
}

impl LoopControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch a stop request. Observed at the next checkpoint.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Clear the stop latch, returning whether it was set.
    pub fn take_stop(&self) -> bool {
        self.stop.swap(false, Ordering::SeqCst)
    }

    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn set_state(&self, state: LoopState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

/// Cloneable, thread-safe handle for stopping and inspecting a loop from
/// another task (a Ctrl+C handler, a UI thread).
#[derive(Debug, Clone)]
pub struct LoopHandle(Arc<LoopControl>);

impl LoopHandle {
    pub fn new(control: Arc<LoopControl>) -> Self {
        Self(control)
    }

    /// Request that the loop stop at its next checkpoint. Idempotent.
    pub fn stop(&self) {
        self.0.request_stop();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.is_stop_requested()
    }

    pub fn state(&self) -> LoopState {
        self.0.state()
    }

    /// True while the loop is generating or executing tools.
    pub fn is_busy(&self) -> bool {
        matches!(self.state(), LoopState::Thinking | LoopState::CallingTool)
    }
}
