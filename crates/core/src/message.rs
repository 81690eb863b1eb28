//! Turn domain types.
//!
//! A [`Turn`] is one entry in the conversation log. Turns are created once
//! and never mutated afterwards; the log only grows at the end (and shrinks
//! at the front through eviction, see [`crate::history`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The role of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System instructions; the first System turn is pinned.
    System,
    /// The end user
    User,
    /// The model
    Assistant,
    /// A batch of tool outcomes fed back to the model
    ToolResult,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::ToolResult => "tool_result",
        }
    }

    /// Label used by transcript rendering.
    pub fn label(&self) -> &'static str {
        match self {
            Self::System => "System",
            Self::User => "User",
            Self::Assistant => "Assistant",
            Self::ToolResult => "Tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "tool_result" | "tool" => Ok(Self::ToolResult),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// A single conversation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced this turn
    pub role: Role,

    /// The text content
    pub text: String,

    /// Opaque image references (paths or encoded data), in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    /// Tool name, set only on ToolResult turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// Call id(s) this result answers, set only on ToolResult turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

impl Turn {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            images: Vec::new(),
            tool_name: None,
            call_id: None,
        }
    }

    /// Create a system turn.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    /// Create a user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create a user turn with attached images.
    pub fn user_with_images(text: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            images,
            ..Self::new(Role::User, text)
        }
    }

    /// Create an assistant turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// Create a tool result turn.
    pub fn tool_result(
        tool_name: impl Into<String>,
        call_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            call_id: Some(call_id.into()),
            ..Self::new(Role::ToolResult, text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_turn() {
        let turn = Turn::user("Hello, agent!");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.text, "Hello, agent!");
        assert!(turn.images.is_empty());
        assert!(turn.tool_name.is_none());
    }

    #[test]
    fn tool_result_carries_ids() {
        let turn = Turn::tool_result("tools", "call_0,call_1", "Tool Results:");
        assert_eq!(turn.role, Role::ToolResult);
        assert_eq!(turn.tool_name.as_deref(), Some("tools"));
        assert_eq!(turn.call_id.as_deref(), Some("call_0,call_1"));
    }

    #[test]
    fn role_string_roundtrip() {
        for role in [Role::System, Role::User, Role::Assistant, Role::ToolResult] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("narrator".parse::<Role>().is_err());
    }

    #[test]
    fn turn_serialization_skips_empty_fields() {
        let json = serde_json::to_string(&Turn::assistant("done")).unwrap();
        assert!(json.contains(r#""role":"assistant""#));
        assert!(!json.contains("images"));
        assert!(!json.contains("tool_name"));
    }
}
