//! Now-playing recognition for radio web players.
//!
//! [`loader::InfoLoader`] polls the station's web player document and,
//! optionally, a local script reporting the radio text, reconciles both into
//! one current [`song::Song`] and writes snapshots of it to song files.

pub mod config;
pub mod error;
pub mod listener;
pub mod loader;
pub mod platform;
pub mod recognition;
pub mod script;
pub mod song;
pub mod webplayer;
pub mod writer;

pub use config::{Config, LoaderConfig, ScriptConfig, ScriptSupport};
pub use error::{ErrorCategory, LoaderError};
pub use listener::{ChannelListener, LoaderEvent, LoaderListener};
pub use loader::{InfoLoader, Sources};
pub use song::{RadioText, Song};
