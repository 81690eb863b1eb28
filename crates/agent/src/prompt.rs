//! Prompt rendering.
//!
//! The model sees a ChatML transcript: the system prompt with the tool
//! catalog appended, then every history turn, then an open assistant turn.

use std::fmt::Write as _;
use thinkact_core::history::ConversationHistory;
use thinkact_core::message::Role;
use thinkact_core::tool::{ToolCallRequest, ToolOutcome};

/// Placeholder emitted once per attached image on user turns.
pub const IMAGE_PLACEHOLDER: &str = "<|vision_start|><|image_pad|><|vision_end|>";

/// Render the full prompt for one model call.
///
/// The pinned system turn (if any) opens the prompt with `catalog` appended.
/// Unpinned system turns are not rendered.
pub fn build_prompt(history: &ConversationHistory, catalog: &str) -> String {
    let mut out = String::new();

    let system = history.pinned().map(|t| t.text.as_str()).unwrap_or("");
    let _ = write!(out, "<|im_start|>system\n{system}\n\n{catalog}<|im_end|>\n");

    for turn in history.turns() {
        match turn.role {
            Role::System => {}
            Role::User => {
                out.push_str("<|im_start|>user\n");
                for _ in &turn.images {
                    out.push_str(IMAGE_PLACEHOLDER);
                }
                let _ = writeln!(out, "{}<|im_end|>", turn.text);
            }
            Role::Assistant => {
                let _ = writeln!(out, "<|im_start|>assistant\n{}<|im_end|>", turn.text);
            }
            Role::ToolResult => {
                let _ = writeln!(out, "<|im_start|>tool\n{}<|im_end|>", turn.text);
            }
        }
    }

    out.push_str("<|im_start|>assistant\n");
    out
}

/// Image references in the order their placeholders appear in the prompt.
pub fn prompt_images(history: &ConversationHistory) -> Vec<String> {
    history
        .turns()
        .iter()
        .filter(|t| t.role == Role::User)
        .flat_map(|t| t.images.iter().cloned())
        .collect()
}

/// Summarize one batch of outcomes as the text of a single tool-result turn.
pub fn format_tool_results(results: &[(ToolCallRequest, ToolOutcome)]) -> String {
    let mut out = String::from("Tool Results:\n");
    for (call, outcome) in results {
        let _ = writeln!(out, "\n### {} (id: {})", call.name, call.id);
        if outcome.succeeded {
            out.push_str("Status: Success\n");
            let _ = writeln!(out, "Output:\n{}", outcome.output);
        } else {
            out.push_str("Status: Failed\n");
            let _ = writeln!(out, "Error: {}", outcome.error());
            if !outcome.output.is_empty() {
                let _ = writeln!(out, "Output:\n{}", outcome.output);
            }
        }
    }
    out
}
