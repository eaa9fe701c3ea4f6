use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub script: ScriptConfig,
}

/// Which recognition sources are consulted on each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptSupport {
    /// Web player only.
    #[default]
    Off,
    /// Web player and script; the web player wins ties.
    On,
    /// Script only.
    Only,
}

impl ScriptSupport {
    pub fn uses_network(self) -> bool {
        match self {
            Self::Off | Self::On => true,
            Self::Only => false,
        }
    }

    pub fn uses_script(self) -> bool {
        match self {
            Self::Off => false,
            Self::On | Self::Only => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Poll period in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Web player playlist document URL.
    #[serde(default)]
    pub url: String,
    /// Folder the song files are written to.
    #[serde(default)]
    pub save_path: String,
    #[serde(default)]
    pub script_support: ScriptSupport,
    /// Whether the web player reporting nothing playing clears the song.
    #[serde(default)]
    pub allow_no_song: bool,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    /// Forward every failure of a source when it is the only one enabled.
    #[serde(default)]
    pub report_sole_source_failures: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Program that runs the recognition script.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Flag that passes script source inline to the interpreter.
    #[serde(default = "default_inline_flag")]
    pub inline_flag: String,
    /// Explicit script location. When unset the script is looked up
    /// beside the executable and in the config directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_script_timeout_ms")]
    pub timeout_ms: u64,
}

impl LoaderConfig {
    pub fn delay(&self) -> Duration {
        // A zero period would spin; tokio's interval rejects it anyway.
        Duration::from_millis(self.delay_ms.max(1))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl ScriptConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            url: String::new(),
            save_path: String::new(),
            script_support: ScriptSupport::default(),
            allow_no_song: false,
            fetch_timeout_ms: default_fetch_timeout_ms(),
            report_sole_source_failures: false,
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            inline_flag: default_inline_flag(),
            path: None,
            timeout_ms: default_script_timeout_ms(),
        }
    }
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_fetch_timeout_ms() -> u64 {
    5000
}

fn default_script_timeout_ms() -> u64 {
    5000
}

fn default_interpreter() -> String {
    "osascript".to_string()
}

fn default_inline_flag() -> String {
    "-e".to_string()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
