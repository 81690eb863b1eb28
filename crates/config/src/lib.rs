//! Configuration loading, validation, and management for thinkact.
//!
//! Loads configuration from `~/.thinkact/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use thinkact_core::agent::AgentConfig;
pub use thinkact_core::provider::GenerationConfig;

/// The root configuration structure.
///
/// Maps directly to `~/.thinkact/config.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model backend endpoint
    #[serde(default)]
    pub backend: BackendConfig,

    /// Reasoning loop limits and system prompt
    #[serde(default)]
    pub agent: AgentConfig,

    /// Sampling parameters and stop sequences
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Connection settings for an OpenAI-compatible completion server.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL up to and including the API version (e.g. `http://host:8000/v1`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name sent with each request
    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer token, if the server requires one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/v1".into()
}
fn default_model() -> String {
    "qwen2-vl-2b-instruct".into()
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Settings for the built-in tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Shell commands containing any of these substrings are refused
    #[serde(default = "default_blocked_commands")]
    pub blocked_commands: Vec<String>,

    /// Default shell timeout; a call may override it
    #[serde(default = "default_shell_timeout_ms")]
    pub shell_timeout_ms: u64,

    /// Shell output beyond this is truncated
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Default working directory for shell commands
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    #[serde(default = "default_web_timeout_ms")]
    pub web_timeout_ms: u64,

    /// Response bodies beyond this are truncated
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// `read_file` refuses larger files
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Include dot-entries in directory listings
    #[serde(default)]
    pub show_hidden: bool,

    /// Depth limit for recursive listings
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,

    #[serde(default = "default_max_grep_matches")]
    pub max_grep_matches: usize,

    /// Where screenshots go when no output path is given
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: String,
}

fn default_blocked_commands() -> Vec<String> {
    ["rm -rf /", "format", "mkfs", "dd if=", ":(){", "fork bomb", "> /dev/sda"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_shell_timeout_ms() -> u64 {
    60_000
}
fn default_max_output_bytes() -> usize {
    1024 * 1024
}
fn default_web_timeout_ms() -> u64 {
    30_000
}
fn default_max_response_bytes() -> usize {
    5 * 1024 * 1024
}
fn default_user_agent() -> String {
    format!("thinkact/{}", env!("CARGO_PKG_VERSION"))
}
fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}
fn default_max_depth() -> usize {
    3
}
fn default_max_search_results() -> usize {
    100
}
fn default_max_grep_matches() -> usize {
    50
}
fn default_screenshot_dir() -> String {
    "screenshots".into()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            blocked_commands: default_blocked_commands(),
            shell_timeout_ms: default_shell_timeout_ms(),
            max_output_bytes: default_max_output_bytes(),
            working_dir: None,
            web_timeout_ms: default_web_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
            user_agent: default_user_agent(),
            max_file_bytes: default_max_file_bytes(),
            show_hidden: false,
            max_depth: default_max_depth(),
            max_search_results: default_max_search_results(),
            max_grep_matches: default_max_grep_matches(),
            screenshot_dir: default_screenshot_dir(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.thinkact/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Ok(Self::load_from(&config_path)?.with_env_overrides())
    }

    /// Load configuration from a specific file path.
    ///
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides:
    /// - `THINKACT_BASE_URL`
    /// - `THINKACT_MODEL`
    /// - `THINKACT_API_KEY`
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("THINKACT_BASE_URL") {
            self.backend.base_url = url;
        }
        if let Ok(model) = std::env::var("THINKACT_MODEL") {
            self.backend.model = model;
        }
        if let Ok(key) = std::env::var("THINKACT_API_KEY") {
            self.backend.api_key = Some(key);
        }
        self
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".thinkact")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let temperature = self.generation.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::ValidationError(
                "generation.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.agent.max_consecutive_errors == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_consecutive_errors must be at least 1".into(),
            ));
        }

        if self.agent.context_budget == 0 {
            return Err(ConfigError::ValidationError(
                "agent.context_budget must be > 0".into(),
            ));
        }

        if self.backend.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "backend.base_url must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.backend.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for thinkact_core::Error {
    fn from(e: ConfigError) -> Self {
        thinkact_core::Error::Config {
            message: e.to_string(),
        }
    }
}
