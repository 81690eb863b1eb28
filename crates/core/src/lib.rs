//! # thinkact core
//!
//! Domain types, traits, and error definitions for the thinkact
//! reason-then-act loop. This crate holds no loop logic of its own; it
//! defines the model that the agent, tool, and provider crates build on.
//!
//! ## Seams
//!
//! - [`Tool`]: one self-describing capability the loop may invoke
//! - [`ToolRegistry`]: name → capability mapping with fault-normalizing dispatch
//! - [`ModelBackend`]: the generative model, consumed through `generate` / `generate_stream`
//! - [`Observer`]: token, tool, and state notifications for a host UI
//! - [`ConversationHistory`]: the bounded, pinned, append-only turn log

pub mod agent;
pub mod error;
pub mod history;
pub mod message;
pub mod observer;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentConfig, LoopControl, LoopHandle, LoopState};
pub use error::{Error, HistoryError, ProviderError, Result, ToolError};
pub use history::ConversationHistory;
pub use message::{Role, Turn};
pub use observer::{FnObserver, NoopObserver, Observer};
pub use provider::{GenerationConfig, GenerationRequest, ModelBackend, TokenStream};
pub use tool::{
    ParamKind, Tool, ToolArguments, ToolCallRequest, ToolOutcome, ToolParameter, ToolRegistry,
    ToolSchema,
};
