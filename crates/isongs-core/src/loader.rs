//! The song loader: polls the recognition sources on a fixed period and
//! serves save requests.
//!
//! Ticks and saves are independent tasks on the surrounding tokio runtime,
//! so a save never waits for a tick and vice versa. All recognition state
//! sits behind one mutex that is never held across an await point or while
//! the listener runs.

use crate::config::Config;
use crate::error::{ErrorCategory, LoaderError};
use crate::listener::LoaderListener;
use crate::recognition::{RecognitionState, TickPolicy};
use crate::script::{RadioTextSource, Script, ScriptSource, UnavailableScript};
use crate::song::Song;
use crate::webplayer::{NowPlayingSource, WebPlayerSource};
use crate::writer;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The recognition sources a loader polls. Which of them are consulted on
/// a tick is decided by the configured script support.
#[derive(Clone, Default)]
pub struct Sources {
    pub network: Option<Arc<dyn NowPlayingSource>>,
    pub script: Option<Arc<dyn RadioTextSource>>,
}

struct Shared {
    state: Mutex<RecognitionState>,
    config: RwLock<Config>,
    sources: RwLock<Sources>,
    listener: Arc<dyn LoaderListener>,
}

struct Schedule {
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

pub struct InfoLoader {
    shared: Arc<Shared>,
    schedule: Mutex<Option<Schedule>>,
    /// Sources were injected and are not rebuilt from the config on start.
    fixed_sources: bool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn cancel_schedule(schedule: Schedule) {
    info!("[loader] Stopping");
    schedule.cancel.cancel();
}

impl Shared {
    fn config(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn sources(&self) -> Sources {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_sources(&self, sources: Sources) {
        *self.sources.write().unwrap_or_else(PoisonError::into_inner) = sources;
    }

    async fn tick(&self) {
        let config = self.config();
        let sources = self.sources();
        let mode = config.loader.script_support;

        let network = async {
            match (&sources.network, mode.uses_network()) {
                (Some(src), true) => Some(src.now_playing().await),
                _ => None,
            }
        };
        let script = async {
            match (&sources.script, mode.uses_script()) {
                (Some(src), true) => Some(src.radio_text().await),
                _ => None,
            }
        };
        let (network, script) = tokio::join!(network, script);

        let policy = TickPolicy {
            allow_no_song: config.loader.allow_no_song,
            report_sole_source_failures: config.loader.report_sole_source_failures,
        };
        let outcome = lock(&self.state).apply_tick(network, script, policy);

        if let Some(text) = &outcome.radio_text {
            self.listener.radio_text_updated(text);
        }
        for err in outcome.errors {
            warn!("[loader] {}", err);
            self.listener.unrelated_error(err);
        }
        if outcome.changed {
            info!("[loader] Track changed: {:?}", lock(&self.state).current());
            self.listener.track_changed();
        }
    }
}

impl InfoLoader {
    pub fn new(config: Config, listener: Arc<dyn LoaderListener>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(RecognitionState::default()),
                config: RwLock::new(config),
                sources: RwLock::new(Sources::default()),
                listener,
            }),
            schedule: Mutex::new(None),
            fixed_sources: false,
        }
    }

    /// Poll `sources` instead of the ones described by the configuration.
    pub fn with_sources(mut self, sources: Sources) -> Self {
        self.shared.set_sources(sources);
        self.fixed_sources = true;
        self
    }

    /// Start polling, first tick immediately. Must be called inside a tokio
    /// runtime. Does nothing if already running.
    pub fn start(&self) {
        let failure = self.start_locked(&mut lock(&self.schedule));
        self.report_start_failure(failure);
    }

    /// Stop scheduling ticks. A tick or save already running is not
    /// interrupted. Safe to call when not started.
    pub fn stop(&self) {
        if let Some(schedule) = lock(&self.schedule).take() {
            cancel_schedule(schedule);
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.schedule).is_some()
    }

    /// Replace the configuration. A running loader is restarted so the new
    /// period and sources take effect.
    pub fn set_config(&self, config: Config) {
        let mut schedule = lock(&self.schedule);
        *self
            .shared
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = config;
        let failure = match schedule.take() {
            Some(running) => {
                cancel_schedule(running);
                self.start_locked(&mut schedule)
            }
            None => None,
        };
        drop(schedule);
        self.report_start_failure(failure);
    }

    /// Set up the schedule. A source that could not be built is returned so
    /// the caller can report it once the schedule lock is released.
    fn start_locked(&self, schedule: &mut Option<Schedule>) -> Option<LoaderError> {
        if schedule.is_some() {
            debug!("[loader] start() while running; ignored");
            return None;
        }

        let config = self.shared.config();
        lock(&self.shared.state).reset_run();
        let mut failure = None;
        if !self.fixed_sources {
            let (sources, err) = self.build_sources(&config);
            self.shared.set_sources(sources);
            failure = err;
        }

        let delay = config.loader.delay();
        info!(
            "[loader] Starting: every {:?}, script support {:?}",
            delay, config.loader.script_support
        );

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(delay);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }
                // Not raced against cancellation: a running tick completes.
                shared.tick().await;
            }
            debug!("[loader] Schedule stopped");
        });

        *schedule = Some(Schedule {
            cancel,
            _task: task,
        });
        failure
    }

    fn report_start_failure(&self, failure: Option<LoaderError>) {
        if let Some(err) = failure {
            self.shared.listener.unrelated_error(err);
        }
    }

    pub fn config(&self) -> Config {
        self.shared.config()
    }

    /// Run one reconciliation tick now, outside the schedule.
    pub async fn tick(&self) {
        self.shared.tick().await;
    }

    pub fn current_song(&self) -> Option<Song> {
        lock(&self.shared.state).current().cloned()
    }

    pub fn previous_song(&self) -> Option<Song> {
        lock(&self.shared.state).previous().cloned()
    }

    pub fn has_track(&self) -> bool {
        lock(&self.shared.state).current().is_some()
    }

    pub fn radio_text(&self) -> Option<String> {
        lock(&self.shared.state).radio_text().map(str::to_string)
    }

    /// Save the song that is current right now. The snapshot is taken
    /// before the task is queued, so a track change in between does not
    /// affect what gets written.
    pub fn save_song(&self) -> JoinHandle<()> {
        self.submit_save(self.current_song())
    }

    /// Write `snapshot` on a worker and report through `song_written`.
    pub fn submit_save(&self, snapshot: Option<Song>) -> JoinHandle<()> {
        let save_path = self.shared.config().loader.save_path;
        let listener = Arc::clone(&self.shared.listener);
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || {
                writer::write_song(snapshot.as_ref(), &save_path)
            })
            .await
            .unwrap_or_else(|e| Err(LoaderError::Io(std::io::Error::other(e))));

            match &result {
                Ok(song) => info!("[save] Saved {}", song),
                Err(e) => warn!("[save] {}", e),
            }
            listener.song_written(result);
        })
    }

    /// Sources for `config`. An unresolvable script is replaced by one that
    /// always fails; the resolution error is returned for reporting.
    fn build_sources(&self, config: &Config) -> (Sources, Option<LoaderError>) {
        let mode = config.loader.script_support;

        let network = mode.uses_network().then(|| {
            Arc::new(WebPlayerSource::new(
                config.loader.url.clone(),
                config.loader.fetch_timeout(),
            )) as Arc<dyn NowPlayingSource>
        });

        let mut failure = None;
        let script = mode.uses_script().then(|| match Script::from_config(&config.script) {
            Ok(script) => {
                Arc::new(ScriptSource::new(script, config.script.timeout())) as Arc<dyn RadioTextSource>
            }
            Err(err) => {
                warn!("[script] {}", err);
                let reason = err.to_string();
                // Counts as the report; the failing ticks that follow are the same episode.
                lock(&self.shared.state)
                    .suppression_mut()
                    .record(ErrorCategory::Script, false);
                failure = Some(err);
                Arc::new(UnavailableScript::new(reason)) as Arc<dyn RadioTextSource>
            }
        });

        (Sources { network, script }, failure)
    }
}

impl Drop for InfoLoader {
    fn drop(&mut self) {
        self.stop();
    }
}
