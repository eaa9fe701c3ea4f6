//! Web player playlist document and the network recognition source.
//!
//! The station's web player publishes a JSON document whose `playlist.data`
//! array lists recent and upcoming tracks. The entry with `playingMode == 1`
//! is the one currently on air.

use crate::error::LoaderError;
use crate::song::Song;
use futures_util::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// `playingMode` value of the entry that is on air.
pub const PLAYING_MODE_CURRENT: i64 = 1;

// ── Document model ────────────────────────────────────────────────────────────
//
// Only `playlist.data[].{artist,title,playingMode}` is required. Everything
// else the player publishes (audio sources, show info, links, tabs) varies
// between stations and may be `null`; it is kept opaque.

#[derive(Debug, Clone, Deserialize)]
pub struct WebPlayerDocument {
    pub playlist: Playlist,
    #[serde(default)]
    pub audioplayer: Option<Value>,
    #[serde(default)]
    pub show: Option<Value>,
    #[serde(default)]
    pub links: Option<Value>,
    #[serde(default)]
    pub tabs: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    #[serde(default)]
    pub feed_url: Option<Value>,
    #[serde(default)]
    pub label: Option<Value>,
    pub data: Vec<PlaylistEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistEntry {
    pub artist: String,
    pub title: String,
    pub playing_mode: i64,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub starttime: Option<Value>,
    #[serde(default)]
    pub duration: Option<Value>,
}

impl WebPlayerDocument {
    pub fn parse(body: &[u8]) -> Result<Self, LoaderError> {
        serde_json::from_slice(body)
            .map_err(|e| LoaderError::Fetch(format!("invalid playlist document: {}", e)))
    }

    /// The first entry flagged as currently playing.
    pub fn playing_entry(&self) -> Option<&PlaylistEntry> {
        self.playlist
            .data
            .iter()
            .find(|entry| entry.playing_mode == PLAYING_MODE_CURRENT)
    }

    pub fn now_playing(&self) -> Option<Song> {
        self.playing_entry()
            .map(|entry| Song::new(entry.title.clone(), entry.artist.clone()))
    }
}

// ── Source seam ───────────────────────────────────────────────────────────────

/// A source of structured now-playing information.
pub trait NowPlayingSource: Send + Sync {
    /// `Ok(None)` means the source answered but nothing is on air.
    fn now_playing(&self) -> BoxFuture<'_, Result<Option<Song>, LoaderError>>;
}

/// Validate the configured URL. Only http(s) can be fetched.
pub fn parse_url(raw: &str) -> Result<reqwest::Url, LoaderError> {
    let url = reqwest::Url::parse(raw.trim()).map_err(|e| LoaderError::Url {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LoaderError::Url {
            url: raw.to_string(),
            reason: format!("unsupported scheme {:?}", other),
        }),
    }
}

/// Fetches the web player document over HTTP. One attempt per call; the
/// loader's tick period is the retry cadence.
#[derive(Debug, Clone)]
pub struct WebPlayerSource {
    client: reqwest::Client,
    url: String,
}

impl WebPlayerSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("isongs/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("[json] Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self {
            client,
            url: url.into(),
        }
    }

    pub async fn fetch(&self) -> Result<Option<Song>, LoaderError> {
        let url = parse_url(&self.url)?;
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let doc = WebPlayerDocument::parse(&body)?;
        let song = doc.now_playing();
        debug!("[json] {} entries, playing: {:?}", doc.playlist.data.len(), song);
        Ok(song)
    }
}

impl NowPlayingSource for WebPlayerSource {
    fn now_playing(&self) -> BoxFuture<'_, Result<Option<Song>, LoaderError>> {
        self.fetch().boxed()
    }
}
