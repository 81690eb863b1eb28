//! screen_capture: screenshot via a platform capture executable.
//!
//! Available only while one of `scrot`, `gnome-screenshot` or macOS
//! `screencapture` is on `PATH`; the lookup runs on every availability check.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thinkact_config::ToolsConfig;
use thinkact_core::error::ToolError;
use thinkact_core::tool::{ParamKind, Tool, ToolArguments, ToolOutcome, ToolParameter, ToolSchema};
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capturer {
    Scrot,
    GnomeScreenshot,
    ScreenCapture,
}

impl Capturer {
    const ALL: [Capturer; 3] = [Self::Scrot, Self::GnomeScreenshot, Self::ScreenCapture];

    fn program(self) -> &'static str {
        match self {
            Self::Scrot => "scrot",
            Self::GnomeScreenshot => "gnome-screenshot",
            Self::ScreenCapture => "screencapture",
        }
    }

    /// Arguments for capturing `region` into `output`, or `None` when this
    /// program cannot capture that region.
    fn args(self, region: &Region, output: &str) -> Option<Vec<String>> {
        let out = output.to_string();
        let args = match (self, region) {
            (Self::Scrot, Region::Full) => vec![out],
            (Self::Scrot, Region::Active) => vec!["-u".into(), out],
            (Self::Scrot, Region::Rect(r)) => vec!["-a".into(), r.clone(), out],
            (Self::GnomeScreenshot, Region::Full) => vec!["-f".into(), out],
            (Self::GnomeScreenshot, Region::Active) => vec!["-w".into(), "-f".into(), out],
            (Self::ScreenCapture, Region::Full) => vec!["-x".into(), out],
            (Self::ScreenCapture, Region::Rect(r)) => vec!["-x".into(), "-R".into(), r.clone(), out],
            _ => return None,
        };
        Some(args)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Region {
    Full,
    Active,
    /// Normalized `x,y,w,h`
    Rect(String),
}

fn parse_region(raw: &str) -> Result<Region, ToolError> {
    match raw.trim() {
        "" | "full" => Ok(Region::Full),
        "active" => Ok(Region::Active),
        rect => {
            let parts: Vec<&str> = rect.split(',').map(str::trim).collect();
            if parts.len() == 4 && parts.iter().all(|p| p.parse::<u32>().is_ok()) {
                Ok(Region::Rect(parts.join(",")))
            } else {
                Err(ToolError::InvalidArguments(format!(
                    "region must be 'full', 'active' or 'x,y,w,h', got '{rect}'"
                )))
            }
        }
    }
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

pub struct ScreenCaptureTool {
    output_dir: PathBuf,
    /// Overrides `PATH` for the executable lookup
    search_path: Option<OsString>,
}

impl ScreenCaptureTool {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.screenshot_dir),
            search_path: None,
        }
    }

    /// Look executables up in `search_path` instead of `PATH`.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    fn find_capturer(&self) -> Option<(Capturer, PathBuf)> {
        let path_var = self.search_path.clone().or_else(|| std::env::var_os("PATH"))?;
        let dirs: Vec<PathBuf> = std::env::split_paths(&path_var).collect();
        Capturer::ALL.into_iter().find_map(|capturer| {
            dirs.iter()
                .map(|dir| dir.join(capturer.program()))
                .find(|candidate| is_executable(candidate))
                .map(|found| (capturer, found))
        })
    }

    fn default_output(&self) -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        self.output_dir.join(format!("screenshot_{stamp}.png"))
    }
}

#[async_trait]
impl Tool for ScreenCaptureTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "screen_capture".into(),
            description: "Capture a screenshot of the screen or a specific window.".into(),
            parameters: vec![
                ToolParameter::optional(
                    "output",
                    ParamKind::String,
                    "Output file path (auto-generated if not provided)",
                    None,
                ),
                ToolParameter::optional(
                    "region",
                    ParamKind::String,
                    "Region to capture: 'full', 'active', or 'x,y,w,h'",
                    Some("full"),
                ),
            ],
        }
    }

    fn is_available(&self) -> bool {
        self.find_capturer().is_some()
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutcome, ToolError> {
        let region = parse_region(arguments.get("region").map_or("full", String::as_str))?;
        let Some((capturer, program)) = self.find_capturer() else {
            return Err(ToolError::Unavailable("screen_capture".into()));
        };

        let output = match arguments.get("output").filter(|o| !o.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => self.default_output(),
        };
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Ok(ToolOutcome::failure(format!(
                    "Failed to create directory {}: {e}",
                    parent.display()
                )));
            }
        }
        let output_str = output.to_string_lossy().into_owned();

        let Some(args) = capturer.args(&region, &output_str) else {
            return Ok(ToolOutcome::failure(format!(
                "{} cannot capture region {region:?}",
                capturer.program()
            )));
        };

        debug!(program = %program.display(), output = %output_str, "Capturing screen");
        let status = Command::new(&program)
            .args(&args)
            .status()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "screen_capture".into(),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Ok(ToolOutcome::failure("Screenshot command failed"));
        }
        if !output.exists() {
            return Ok(ToolOutcome::failure("Screenshot file was not created"));
        }
        Ok(ToolOutcome::success(format!("Screenshot saved: {output_str}")))
    }
}
