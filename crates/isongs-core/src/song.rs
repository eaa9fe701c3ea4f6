//! The recognized-song value and radio-text parsing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between title and interpreter in script radio text.
pub const RADIO_TEXT_SEPARATOR: &str = " / ";

/// A recognized track. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Song {
    pub title: String,
    pub interpreter: String,
}

impl Song {
    pub fn new(title: impl Into<String>, interpreter: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            interpreter: interpreter.into(),
        }
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.title, RADIO_TEXT_SEPARATOR, self.interpreter)
    }
}

/// Output of one script run: the raw text for display plus the song
/// derived from it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioText {
    pub text: String,
    pub song: Option<Song>,
}

impl RadioText {
    pub fn parse(raw: &str) -> Self {
        Self {
            text: raw.trim().to_string(),
            song: parse_radio_text(raw),
        }
    }
}

/// Parse "Title / Interpreter" from free-form radio text.
///
/// Splits at the last separator so titles that themselves contain " / "
/// stay intact; interpreters rarely do.
pub fn parse_radio_text(raw: &str) -> Option<Song> {
    let pos = raw.rfind(RADIO_TEXT_SEPARATOR)?;
    let title = raw[..pos].trim();
    let interpreter = raw[pos + RADIO_TEXT_SEPARATOR.len()..].trim();
    Some(Song::new(title, interpreter))
}
