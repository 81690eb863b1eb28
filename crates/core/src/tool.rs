//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act in the world:
//! execute shell commands, read/write files, fetch web pages, etc.
//! Arguments arrive as named strings exactly as the model wrote them;
//! each tool interprets and validates its own inputs.

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

use crate::error::ToolError;

/// Named string arguments of a tool call. Keys are unique.
pub type ToolArguments = BTreeMap<String, String>;

/// Declared type of a tool parameter. Documentation only; not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Boolean,
    Array,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
        }
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ToolParameter {
    /// A required parameter.
    pub fn required(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
            default: None,
        }
    }

    /// An optional parameter with an optional documented default.
    pub fn optional(name: &str, kind: ParamKind, description: &str, default: Option<&str>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
            default: default.map(str::to_string),
        }
    }
}

/// Static, self-describing metadata for one capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// Parameters in declaration order
    pub parameters: Vec<ToolParameter>,
}

/// A single invocation detected in model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// `call_<n>`, unique within one response
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments by parameter name
    pub arguments: ToolArguments,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Look up an argument value.
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).map(String::as_str)
    }
}

/// The result of a tool execution.
///
/// `succeeded == false` always comes with a non-empty `error_message`.
/// `output` may hold partial output alongside a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// The call id this outcome answers
    pub call_id: String,

    /// Whether the tool executed successfully
    pub succeeded: bool,

    /// The output content, possibly empty
    pub output: String,

    /// Failure description, present iff `!succeeded`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ToolOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            call_id: String::new(),
            succeeded: true,
            output: output.into(),
            error_message: None,
        }
    }

    pub fn failure(error_message: impl Into<String>) -> Self {
        Self::failure_with_output(error_message, String::new())
    }

    /// A failure that still carries partial output (e.g. before a timeout).
    pub fn failure_with_output(error_message: impl Into<String>, output: impl Into<String>) -> Self {
        let message = error_message.into();
        Self {
            call_id: String::new(),
            succeeded: false,
            output: output.into(),
            error_message: Some(if message.is_empty() {
                "Tool reported failure".into()
            } else {
                message
            }),
        }
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = call_id.into();
        self
    }

    /// The error message, or an empty string on success.
    pub fn error(&self) -> &str {
        self.error_message.as_deref().unwrap_or("")
    }

    /// Restore the failure invariant on outcomes built by hand.
    fn normalized(mut self) -> Self {
        if self.succeeded {
            self.error_message = None;
        } else if self.error_message.as_deref().is_none_or(str::is_empty) {
            self.error_message = Some("Tool reported failure".into());
        }
        self
    }
}

/// The core Tool trait.
///
/// Each capability (list_directory, shell, web_fetch, ...) implements this
/// trait and is registered in a [`ToolRegistry`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Static metadata. Pure; no side effects.
    fn schema(&self) -> ToolSchema;

    /// Whether the tool can run right now. Re-checked on every dispatch.
    fn is_available(&self) -> bool {
        true
    }

    /// Whether executing blocks on a human answering. The loop reports
    /// `WaitingForUser` while such a call runs.
    fn needs_user_input(&self) -> bool {
        false
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutcome, ToolError>;

    /// Convenience accessor for the schema name.
    fn name(&self) -> String {
        self.schema().name
    }
}

/// Format used by models to request a call; embedded in the catalog.
const CALL_FORMAT: &str = "<tool_call>\nname: tool_name\narguments:\n  param1: value1\n  param2: value2\n</tool_call>\n";

/// A registry of tools keyed by name.
///
/// Iteration is in name order, so the rendered catalog is stable for a
/// given registered set.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name();
        if self.tools.insert(name.clone(), tool).is_some() {
            debug!(tool = %name, "Replaced previously registered tool");
        }
    }

    /// Get a tool by name, available or not.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Tools whose availability check passes right now.
    pub fn available(&self) -> Vec<&dyn Tool> {
        self.tools
            .values()
            .filter(|t| t.is_available())
            .map(|t| t.as_ref())
            .collect()
    }

    /// Schemas of the available tools.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.available().iter().map(|t| t.schema()).collect()
    }

    /// Whether the named tool waits on the user. Unknown names do not.
    pub fn needs_user_input(&self, name: &str) -> bool {
        self.tools.get(name).is_some_and(|t| t.needs_user_input())
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Render the available tools as a prompt section.
    pub fn render_catalog(&self) -> String {
        let mut out = String::new();
        out.push_str("## Available Tools\n\n");
        out.push_str("You can use these tools by outputting a tool call in this format:\n");
        out.push_str("```\n");
        out.push_str(CALL_FORMAT);
        out.push_str("```\n\n");

        for schema in self.schemas() {
            let _ = writeln!(out, "### {}", schema.name);
            let _ = writeln!(out, "{}\n", schema.description);
            out.push_str("**Parameters:**\n");
            for param in &schema.parameters {
                let _ = write!(out, "- `{}` ({}", param.name, param.kind.as_str());
                if param.required {
                    out.push_str(", required");
                }
                let _ = write!(out, "): {}", param.description);
                if let Some(default) = &param.default {
                    let _ = write!(out, " (default: {default})");
                }
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }

    /// Execute a tool call. Never fails: every fault becomes a failure outcome
    /// whose `call_id` is the request's id.
    pub async fn dispatch(&self, request: &ToolCallRequest) -> ToolOutcome {
        let Some(tool) = self.tools.get(&request.name) else {
            warn!(tool = %request.name, call_id = %request.id, "Unknown tool requested");
            return ToolOutcome::failure(format!("Unknown tool: {}", request.name))
                .with_call_id(&request.id);
        };

        if !tool.is_available() {
            warn!(tool = %request.name, call_id = %request.id, "Tool not available");
            return ToolOutcome::failure(format!("Tool not available: {}", request.name))
                .with_call_id(&request.id);
        }

        let start = std::time::Instant::now();
        let result = AssertUnwindSafe(tool.execute(&request.arguments))
            .catch_unwind()
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(Ok(outcome)) => outcome.normalized(),
            // already reads "Tool execution failed: ..."
            Ok(Err(e @ ToolError::ExecutionFailed { .. })) => ToolOutcome::failure(e.to_string()),
            Ok(Err(e)) => ToolOutcome::failure(format!("Tool execution failed: {e}")),
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "panic".into());
                ToolOutcome::failure(format!("Tool execution failed: {reason}"))
            }
        }
        .with_call_id(&request.id);

        debug!(
            tool = %request.name,
            call_id = %request.id,
            success = outcome.succeeded,
            duration_ms,
            "Tool dispatched"
        );
        outcome
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
