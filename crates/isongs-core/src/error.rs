use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong while recognizing or saving a song.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The configured web-player URL cannot be parsed.
    #[error("invalid web player URL {url:?}: {reason}")]
    Url { url: String, reason: String },

    /// Network failure or an unreadable playlist document.
    #[error("failed to fetch now-playing info: {0}")]
    Fetch(String),

    /// The script could not be launched, wrote to stderr, or exited
    /// unsuccessfully.
    #[error("script execution failed: {0}")]
    ScriptExecution(String),

    #[error("script did not finish within {0:?}")]
    ScriptTimeout(Duration),

    #[error("no track recognized")]
    NoTrack,

    #[error("save folder is not set")]
    SaveFolderUnset,

    #[error("failed to write song file: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure classes that share one suppression flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Url,
    Fetch,
    Script,
}

impl ErrorCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Fetch => "fetch",
            Self::Script => "script",
        }
    }
}

impl LoaderError {
    /// The suppression category for adapter failures. Save failures come
    /// from explicit user action and are never suppressed.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Url { .. } => Some(ErrorCategory::Url),
            Self::Fetch(_) => Some(ErrorCategory::Fetch),
            Self::ScriptExecution(_) | Self::ScriptTimeout(_) => Some(ErrorCategory::Script),
            Self::NoTrack | Self::SaveFolderUnset | Self::Io(_) => None,
        }
    }
}

impl From<reqwest::Error> for LoaderError {
    fn from(e: reqwest::Error) -> Self {
        Self::Fetch(e.to_string())
    }
}
