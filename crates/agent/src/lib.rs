//! The reasoning loop: the heart of thinkact.
//!
//! The loop follows a **Think → Act → Observe** cycle:
//!
//! 1. **Receive** a user message (optionally with images)
//! 2. **Render** the prompt (system prompt + tool catalog + history)
//! 3. **Generate** via the configured model backend, streaming tokens out
//! 4. **If tool calls**: dispatch them, append one result turn, loop back to step 2
//! 5. **If plain text**: that text is the answer
//!
//! The loop continues until the model answers without tool calls, a stop is
//! requested, the consecutive-error threshold is hit, or the iteration
//! limit is reached.

pub mod loop_runner;
pub mod parser;
pub mod prompt;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use loop_runner::{LoopReport, ReasoningLoop, ReasoningLoopBuilder, Termination};
pub use parser::{parse_tool_calls, strip_tool_calls};
pub use prompt::{build_prompt, format_tool_results};
pub use stream_event::{AgentStreamEvent, ChannelObserver};
