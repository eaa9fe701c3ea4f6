//! Script-based recognition: run an OS script that reports the radio text
//! of the station currently tuned in, e.g. through `osascript`.

use crate::config::ScriptConfig;
use crate::error::LoaderError;
use crate::platform;
use crate::song::RadioText;
use futures_util::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// File extension of precompiled scripts, which are passed by path.
pub const COMPILED_EXTENSION: &str = "scpt";

/// A runnable recognition script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// Run as `<interpreter> <path>`.
    Compiled { interpreter: String, path: PathBuf },
    /// Run as `<interpreter> <inline_flag> <content>`.
    Source {
        interpreter: String,
        inline_flag: String,
        content: String,
    },
}

impl Script {
    pub fn compiled(interpreter: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Compiled {
            interpreter: interpreter.into(),
            path: path.into(),
        }
    }

    pub fn inline(
        interpreter: impl Into<String>,
        inline_flag: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Source {
            interpreter: interpreter.into(),
            inline_flag: inline_flag.into(),
            content: content.into(),
        }
    }

    /// Resolve the script from configuration: the explicit path if set,
    /// otherwise the bundled script found by [`platform::find_recognition_script`].
    pub fn from_config(config: &ScriptConfig) -> Result<Self, LoaderError> {
        let path = match &config.path {
            Some(p) => p.clone(),
            None => platform::find_recognition_script().ok_or_else(|| {
                LoaderError::ScriptExecution(format!(
                    "no recognition script found (looked for {} and {})",
                    platform::COMPILED_SCRIPT_NAME,
                    platform::SOURCE_SCRIPT_NAME
                ))
            })?,
        };
        Self::load(config, &path)
    }

    fn load(config: &ScriptConfig, path: &Path) -> Result<Self, LoaderError> {
        let is_compiled = path
            .extension()
            .map(|ext| ext == COMPILED_EXTENSION)
            .unwrap_or(false);
        if is_compiled {
            if !path.exists() {
                return Err(LoaderError::ScriptExecution(format!(
                    "script not found: {}",
                    path.display()
                )));
            }
            info!("[script] Using compiled script {}", path.display());
            return Ok(Self::compiled(config.interpreter.clone(), path));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            LoaderError::ScriptExecution(format!("failed to read {}: {}", path.display(), e))
        })?;
        info!("[script] Using script source {}", path.display());
        Ok(Self::inline(
            config.interpreter.clone(),
            config.inline_flag.clone(),
            content,
        ))
    }

    fn interpreter(&self) -> &str {
        match self {
            Self::Compiled { interpreter, .. } | Self::Source { interpreter, .. } => interpreter,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(self.interpreter());
        match self {
            Self::Compiled { path, .. } => {
                cmd.arg(path);
            }
            Self::Source {
                inline_flag,
                content,
                ..
            } => {
                cmd.arg(inline_flag).arg(content);
            }
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run the script and return its standard output.
    ///
    /// Anything written to stderr is a failure carrying that text. The
    /// process is killed if it outlives `timeout`.
    pub async fn execute(&self, timeout: Duration) -> Result<String, LoaderError> {
        let child = self.command().spawn().map_err(|e| {
            LoaderError::ScriptExecution(format!("failed to launch {}: {}", self.interpreter(), e))
        })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| LoaderError::ScriptTimeout(timeout))?
            .map_err(|e| LoaderError::ScriptExecution(e.to_string()))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            return Err(LoaderError::ScriptExecution(stderr.trim().to_string()));
        }
        if !output.status.success() {
            return Err(LoaderError::ScriptExecution(format!(
                "{} exited with {}",
                self.interpreter(),
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("[script] stdout: {:?}", stdout.trim());
        Ok(stdout)
    }
}

// ── Source seam ───────────────────────────────────────────────────────────────

/// A source of free-form radio text.
pub trait RadioTextSource: Send + Sync {
    fn radio_text(&self) -> BoxFuture<'_, Result<RadioText, LoaderError>>;
}

#[derive(Debug, Clone)]
pub struct ScriptSource {
    script: Script,
    timeout: Duration,
}

impl ScriptSource {
    pub fn new(script: Script, timeout: Duration) -> Self {
        Self { script, timeout }
    }

    pub async fn fetch(&self) -> Result<RadioText, LoaderError> {
        let raw = self.script.execute(self.timeout).await?;
        Ok(RadioText::parse(&raw))
    }
}

impl RadioTextSource for ScriptSource {
    fn radio_text(&self) -> BoxFuture<'_, Result<RadioText, LoaderError>> {
        self.fetch().boxed()
    }
}

/// Stands in when no script could be resolved; every run fails.
#[derive(Debug, Clone)]
pub struct UnavailableScript {
    reason: String,
}

impl UnavailableScript {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl RadioTextSource for UnavailableScript {
    fn radio_text(&self) -> BoxFuture<'_, Result<RadioText, LoaderError>> {
        let err = LoaderError::ScriptExecution(self.reason.clone());
        async move { Err(err) }.boxed()
    }
}
