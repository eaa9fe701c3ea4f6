use crate::error::LoaderError;
use crate::song::Song;
use tokio::sync::mpsc;

/// Receives everything the loader reports. Called from worker tasks, never
/// while the loader holds any of its locks, so callbacks may call back into it.
pub trait LoaderListener: Send + Sync + 'static {
    /// The current song changed; re-read it with `InfoLoader::current_song`.
    fn track_changed(&self) {}

    /// Outcome of a save request. Save errors are never suppressed.
    fn song_written(&self, _result: Result<Song, LoaderError>) {}

    /// Fresh radio text from the script source, whether or not it named a song.
    fn radio_text_updated(&self, _text: &str) {}

    /// A recognition source failed. Repeats within one failure episode are
    /// filtered before reaching this.
    fn unrelated_error(&self, _error: LoaderError) {}
}

/// Listener events as channel messages.
#[derive(Debug)]
pub enum LoaderEvent {
    TrackChanged,
    SongWritten(Result<Song, LoaderError>),
    RadioText(String),
    Error(LoaderError),
}

/// Forwards every callback into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<LoaderEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LoaderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LoaderListener for ChannelListener {
    // Send errors mean the receiver is gone; nothing left to notify.
    fn track_changed(&self) {
        let _ = self.tx.send(LoaderEvent::TrackChanged);
    }

    fn song_written(&self, result: Result<Song, LoaderError>) {
        let _ = self.tx.send(LoaderEvent::SongWritten(result));
    }

    fn radio_text_updated(&self, text: &str) {
        let _ = self.tx.send(LoaderEvent::RadioText(text.to_string()));
    }

    fn unrelated_error(&self, error: LoaderError) {
        let _ = self.tx.send(LoaderEvent::Error(error));
    }
}
