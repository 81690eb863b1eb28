//! Shell tool: execute system commands.
//!
//! Supports a substring blocklist, a working directory, a timeout that kills
//! the child, and an output cap. stdout and stderr are merged in arrival
//! order.

use async_trait::async_trait;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thinkact_config::ToolsConfig;
use thinkact_core::error::ToolError;
use thinkact_core::tool::{ParamKind, Tool, ToolArguments, ToolOutcome, ToolParameter, ToolSchema};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::{parsed_arg, required_arg};

const TRUNCATION_NOTICE: &str = "\n... (output truncated)";

/// Execute shell commands with safety constraints.
pub struct ShellTool {
    /// Commands containing any of these substrings are refused.
    blocked_commands: Vec<String>,
    default_timeout_ms: u64,
    max_output_bytes: usize,
    working_dir: Option<String>,
}

impl ShellTool {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            blocked_commands: config.blocked_commands.clone(),
            default_timeout_ms: config.shell_timeout_ms,
            max_output_bytes: config.max_output_bytes,
            working_dir: config.working_dir.clone(),
        }
    }

    /// The blocklist entry a command trips, if any.
    fn blocked_by(&self, command: &str) -> Option<&str> {
        self.blocked_commands
            .iter()
            .find(|b| !b.is_empty() && command.contains(b.as_str()))
            .map(String::as_str)
    }
}

/// Merged output of a child, capped at `limit` bytes.
struct Captured {
    bytes: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl Captured {
    fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
            truncated: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        let room = self.limit.saturating_sub(self.bytes.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    fn into_text(self) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.truncated {
            text.push_str(TRUNCATION_NOTICE);
        }
        text
    }
}

async fn read_some<R: AsyncRead + Unpin>(pipe: &mut Option<R>, chunk: &mut [u8]) -> std::io::Result<usize> {
    match pipe {
        Some(p) => p.read(chunk).await,
        None => std::future::pending().await,
    }
}

/// Drain both pipes until EOF, then reap the child.
async fn collect(child: &mut Child, captured: &mut Captured) -> std::io::Result<ExitStatus> {
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out_chunk = [0u8; 4096];
    let mut err_chunk = [0u8; 4096];

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            n = read_some(&mut stdout, &mut out_chunk) => match n? {
                0 => stdout = None,
                n => captured.push(&out_chunk[..n]),
            },
            n = read_some(&mut stderr, &mut err_chunk) => match n? {
                0 => stderr = None,
                n => captured.push(&err_chunk[..n]),
            },
        }
    }
    child.wait().await
}

fn shell_command(command: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn schema(&self) -> ToolSchema {
        let default_timeout = self.default_timeout_ms.to_string();
        ToolSchema {
            name: "shell".into(),
            description: "Execute a shell command. Use for git, build tools, package managers, etc.".into(),
            parameters: vec![
                ToolParameter::required("command", ParamKind::String, "The command to execute"),
                ToolParameter::optional(
                    "working_dir",
                    ParamKind::String,
                    "Working directory for the command",
                    None,
                ),
                ToolParameter::optional(
                    "timeout",
                    ParamKind::Integer,
                    "Timeout in milliseconds",
                    Some(default_timeout.as_str()),
                ),
            ],
        }
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutcome, ToolError> {
        let command = required_arg(arguments, "command")?;
        if command.trim().is_empty() {
            return Err(ToolError::InvalidArguments("command must not be empty".into()));
        }
        if let Some(blocked) = self.blocked_by(command) {
            warn!(command = %command, blocked = %blocked, "Refusing blocked command");
            return Ok(ToolOutcome::failure(format!("Command blocked for security: {blocked}")));
        }

        let timeout_ms = parsed_arg(arguments, "timeout", self.default_timeout_ms)?;
        let working_dir = arguments
            .get("working_dir")
            .filter(|d| !d.trim().is_empty())
            .or(self.working_dir.as_ref());

        let mut cmd = shell_command(command);
        if let Some(dir) = working_dir {
            if !Path::new(dir).is_dir() {
                return Ok(ToolOutcome::failure(format!("Working directory not found: {dir}")));
            }
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = %command, timeout_ms, "Executing shell command");

        let mut child = cmd.spawn().map_err(|e| ToolError::ExecutionFailed {
            tool_name: "shell".into(),
            reason: e.to_string(),
        })?;

        let mut captured = Captured::new(self.max_output_bytes);
        let waited = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            collect(&mut child, &mut captured),
        )
        .await;

        match waited {
            Err(_) => {
                warn!(command = %command, timeout_ms, "Command timed out");
                let _ = child.start_kill();
                let _ = child.wait().await;
                Ok(ToolOutcome::failure_with_output(
                    format!("Command timed out after {timeout_ms}ms"),
                    captured.into_text(),
                ))
            }
            Ok(Err(e)) => Err(ToolError::ExecutionFailed {
                tool_name: "shell".into(),
                reason: e.to_string(),
            }),
            Ok(Ok(status)) => {
                let output = captured.into_text();
                if status.success() {
                    return Ok(ToolOutcome::success(output));
                }
                let message = match status.code() {
                    Some(code) => format!("Exit code: {code}"),
                    None => "Terminated by signal".to_string(),
                };
                debug!(command = %command, %message, "Command failed");
                Ok(ToolOutcome::failure_with_output(message, output))
            }
        }
    }
}
