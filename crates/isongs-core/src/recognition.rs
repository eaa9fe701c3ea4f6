//! Reconciliation of the two recognition sources into one current song.
//!
//! Everything here is synchronous and lock-free; [`crate::loader`] owns the
//! [`RecognitionState`] behind a single mutex and feeds it the results of
//! each tick.
//!
//! ## Acceptance rules
//!
//! A candidate is *new* if it differs from the last raw candidate of the
//! same source, from the previous song and from the current song. The
//! previous-song check keeps the display from flipping back to a song that
//! was just replaced. For the web player an empty answer ("nothing on air")
//! only counts when `allow_no_song` is set, and then the previous-song check
//! is skipped while no previous song exists. The script never clears the
//! song. When both sources produce a new candidate, the web player wins.

use crate::error::{ErrorCategory, LoaderError};
use crate::song::{RadioText, Song};
use std::collections::HashSet;
use tracing::debug;

/// Remembers which error categories were already forwarded during the
/// current failure episode.
#[derive(Debug, Default, Clone)]
pub struct ErrorSuppression {
    forwarded: HashSet<ErrorCategory>,
}

impl ErrorSuppression {
    /// Record a failure. Returns whether it should be forwarded: only the
    /// first failure of an episode is, unless `always` is set.
    pub fn record(&mut self, category: ErrorCategory, always: bool) -> bool {
        let first = self.forwarded.insert(category);
        first || always
    }

    /// A success ends the episode for `category`.
    pub fn resolve(&mut self, category: ErrorCategory) {
        self.forwarded.remove(&category);
    }

    #[cfg(test)]
    pub(crate) fn is_forwarded(&self, category: ErrorCategory) -> bool {
        self.forwarded.contains(&category)
    }

    pub fn reset(&mut self) {
        self.forwarded.clear();
    }
}

/// Per-tick policy knobs taken from the configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickPolicy {
    pub allow_no_song: bool,
    pub report_sole_source_failures: bool,
}

/// What a tick produced besides the state change itself. The loader
/// delivers these to the listener after releasing the state lock.
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub changed: bool,
    pub radio_text: Option<String>,
    pub errors: Vec<LoaderError>,
}

#[derive(Debug, Default)]
pub struct RecognitionState {
    current: Option<Song>,
    previous: Option<Song>,
    last_json: Option<Song>,
    last_script: Option<Song>,
    radio_text: Option<String>,
    suppression: ErrorSuppression,
}

impl RecognitionState {
    pub fn current(&self) -> Option<&Song> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&Song> {
        self.previous.as_ref()
    }

    pub fn radio_text(&self) -> Option<&str> {
        self.radio_text.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn suppression(&self) -> &ErrorSuppression {
        &self.suppression
    }

    pub fn suppression_mut(&mut self) -> &mut ErrorSuppression {
        &mut self.suppression
    }

    /// Start a fresh run: forget forwarded errors and cached candidates.
    /// The current and previous song survive a restart.
    pub fn reset_run(&mut self) {
        self.suppression.reset();
        self.last_json = None;
        self.last_script = None;
    }

    /// Apply one tick. `None` for a source means it was not consulted.
    pub fn apply_tick(
        &mut self,
        network: Option<Result<Option<Song>, LoaderError>>,
        script: Option<Result<RadioText, LoaderError>>,
        policy: TickPolicy,
    ) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        let network_sole = script.is_none();
        let script_sole = network.is_none();
        let always_network = policy.report_sole_source_failures && network_sole;
        let always_script = policy.report_sole_source_failures && script_sole;

        let json = network.and_then(|result| match result {
            Ok(song) => {
                self.suppression.resolve(ErrorCategory::Url);
                self.suppression.resolve(ErrorCategory::Fetch);
                Some(song)
            }
            Err(err) => {
                // A fetch failure means the URL itself was fine.
                if err.category() == Some(ErrorCategory::Fetch) {
                    self.suppression.resolve(ErrorCategory::Url);
                }
                self.forward(err, always_network, &mut outcome);
                None
            }
        });

        let scripted = script.and_then(|result| match result {
            Ok(rt) => {
                self.suppression.resolve(ErrorCategory::Script);
                outcome.radio_text = Some(rt.text.clone());
                self.radio_text = Some(rt.text);
                Some(rt.song)
            }
            Err(err) => {
                self.forward(err, always_script, &mut outcome);
                None
            }
        });

        let new_json = match json {
            Some(candidate) => {
                let accepted = self.is_new_json(&candidate, policy.allow_no_song);
                self.last_json = candidate.clone();
                accepted.then_some(candidate)
            }
            None => None,
        };

        let new_script = match scripted {
            Some(candidate) => {
                let accepted = self.is_new_script(&candidate);
                self.last_script = candidate.clone();
                accepted.then_some(candidate)
            }
            None => None,
        };

        if let Some(song) = new_json.or(new_script) {
            debug!("[loader] Current song {:?} -> {:?}", self.current, song);
            self.previous = std::mem::replace(&mut self.current, song);
            outcome.changed = true;
        }

        outcome
    }

    fn forward(&mut self, err: LoaderError, always: bool, outcome: &mut TickOutcome) {
        let Some(category) = err.category() else {
            outcome.errors.push(err);
            return;
        };
        if self.suppression.record(category, always) {
            outcome.errors.push(err);
        } else {
            debug!("[loader] Suppressed repeated {} error: {}", category.label(), err);
        }
    }

    fn is_new_json(&self, candidate: &Option<Song>, allow_no_song: bool) -> bool {
        (allow_no_song || candidate.is_some())
            && *candidate != self.last_json
            && ((allow_no_song && self.previous.is_none()) || *candidate != self.previous)
            && *candidate != self.current
    }

    fn is_new_script(&self, candidate: &Option<Song>) -> bool {
        candidate.is_some()
            && *candidate != self.last_script
            && *candidate != self.previous
            && *candidate != self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(title: &str) -> Song {
        Song::new(title, "Artist")
    }

    fn json(s: Option<Song>) -> Option<Result<Option<Song>, LoaderError>> {
        Some(Ok(s))
    }

    fn fetch_err() -> Option<Result<Option<Song>, LoaderError>> {
        Some(Err(LoaderError::Fetch("connection refused".into())))
    }

    fn url_err() -> Option<Result<Option<Song>, LoaderError>> {
        Some(Err(LoaderError::Url { url: String::new(), reason: "empty".into() }))
    }

    fn text(raw: &str) -> Option<Result<RadioText, LoaderError>> {
        Some(Ok(RadioText::parse(raw)))
    }

    fn script_err() -> Option<Result<RadioText, LoaderError>> {
        Some(Err(LoaderError::ScriptExecution("boom".into())))
    }

    const POLICY: TickPolicy = TickPolicy { allow_no_song: false, report_sole_source_failures: false };
    const ALLOW_NO_SONG: TickPolicy = TickPolicy { allow_no_song: true, report_sole_source_failures: false };

    #[test]
    fn test_accept_dedup_and_change() {
        let mut state = RecognitionState::default();

        assert!(state.apply_tick(json(Some(song("A"))), None, POLICY).changed);
        assert_eq!(state.current(), Some(&song("A")));

        assert!(!state.apply_tick(json(Some(song("A"))), None, POLICY).changed);

        assert!(state.apply_tick(json(Some(song("B"))), None, POLICY).changed);
        assert_eq!(state.current(), Some(&song("B")));
        assert_eq!(state.previous(), Some(&song("A")));
    }

    #[test]
    fn test_no_flip_back_to_previous() {
        let mut state = RecognitionState::default();
        state.apply_tick(json(Some(song("A"))), None, POLICY);
        state.apply_tick(json(Some(song("B"))), None, POLICY);

        assert!(!state.apply_tick(json(Some(song("A"))), None, POLICY).changed);
        assert_eq!(state.current(), Some(&song("B")));
    }

    #[test]
    fn test_empty_answer_ignored_without_allow_no_song() {
        let mut state = RecognitionState::default();
        state.apply_tick(json(Some(song("A"))), None, POLICY);

        assert!(!state.apply_tick(json(None), None, POLICY).changed);
        assert_eq!(state.current(), Some(&song("A")));
    }

    #[test]
    fn test_empty_answer_clears_with_allow_no_song() {
        let mut state = RecognitionState::default();
        state.apply_tick(json(Some(song("A"))), None, ALLOW_NO_SONG);

        assert!(state.apply_tick(json(None), None, ALLOW_NO_SONG).changed);
        assert_eq!(state.current(), None);
        assert_eq!(state.previous(), Some(&song("A")));

        // A is the previous song now and is not taken back.
        assert!(!state.apply_tick(json(Some(song("A"))), None, ALLOW_NO_SONG).changed);
        assert!(state.apply_tick(json(Some(song("B"))), None, ALLOW_NO_SONG).changed);
    }

    #[test]
    fn test_empty_answer_on_fresh_state_is_not_a_change() {
        let mut state = RecognitionState::default();
        assert!(!state.apply_tick(json(None), None, ALLOW_NO_SONG).changed);
        assert!(!state.apply_tick(json(None), None, POLICY).changed);
    }

    #[test]
    fn test_failure_does_not_clear_song() {
        let mut state = RecognitionState::default();
        state.apply_tick(json(Some(song("A"))), None, ALLOW_NO_SONG);

        let outcome = state.apply_tick(url_err(), None, ALLOW_NO_SONG);
        assert!(!outcome.changed);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(state.current(), Some(&song("A")));

        assert!(!state.apply_tick(fetch_err(), None, ALLOW_NO_SONG).changed);
        assert_eq!(state.current(), Some(&song("A")));
    }

    #[test]
    fn test_failure_leaves_candidate_cache() {
        let mut state = RecognitionState::default();
        state.apply_tick(json(Some(song("A"))), None, POLICY);
        state.apply_tick(fetch_err(), None, POLICY);
        assert!(!state.apply_tick(json(Some(song("A"))), None, POLICY).changed);
    }

    #[test]
    fn test_network_wins_over_script() {
        let mut state = RecognitionState::default();
        let outcome = state.apply_tick(json(Some(song("Web"))), text("Script / Artist"), POLICY);
        assert!(outcome.changed);
        assert_eq!(state.current(), Some(&song("Web")));
        assert_eq!(outcome.radio_text.as_deref(), Some("Script / Artist"));

        // Script stays cached and is not re-evaluated on the next tick.
        let outcome = state.apply_tick(json(Some(song("Web"))), text("Script / Artist"), POLICY);
        assert!(!outcome.changed);
        assert_eq!(state.current(), Some(&song("Web")));
    }

    #[test]
    fn test_script_used_when_network_has_nothing_new() {
        let mut state = RecognitionState::default();
        state.apply_tick(json(Some(song("Web"))), text("News"), POLICY);

        let outcome = state.apply_tick(json(Some(song("Web"))), text("Next / Artist"), POLICY);
        assert!(outcome.changed);
        assert_eq!(state.current(), Some(&song("Next")));
        assert_eq!(state.previous(), Some(&song("Web")));
    }

    #[test]
    fn test_script_text_without_song() {
        let mut state = RecognitionState::default();
        let outcome = state.apply_tick(None, text("Traffic news"), POLICY);
        assert!(!outcome.changed);
        assert_eq!(outcome.radio_text.as_deref(), Some("Traffic news"));
        assert_eq!(state.radio_text(), Some("Traffic news"));
        assert_eq!(state.current(), None);
    }

    #[test]
    fn test_no_sources_no_change() {
        let mut state = RecognitionState::default();
        let outcome = state.apply_tick(None, None, ALLOW_NO_SONG);
        assert!(!outcome.changed);
        assert!(outcome.errors.is_empty());
        assert!(outcome.radio_text.is_none());
    }

    #[test]
    fn test_failure_forwarded_once_per_episode() {
        let mut state = RecognitionState::default();

        assert_eq!(state.apply_tick(fetch_err(), None, POLICY).errors.len(), 1);
        assert_eq!(state.apply_tick(fetch_err(), None, POLICY).errors.len(), 0);
        assert_eq!(state.apply_tick(fetch_err(), None, POLICY).errors.len(), 0);
        assert!(state.suppression().is_forwarded(ErrorCategory::Fetch));

        state.apply_tick(json(Some(song("A"))), None, POLICY);
        assert!(!state.suppression().is_forwarded(ErrorCategory::Fetch));

        assert_eq!(state.apply_tick(fetch_err(), None, POLICY).errors.len(), 1);
    }

    #[test]
    fn test_categories_are_independent() {
        let mut state = RecognitionState::default();
        let outcome = state.apply_tick(url_err(), script_err(), POLICY);
        assert_eq!(outcome.errors.len(), 2);

        // Script recovers, web player keeps failing.
        let outcome = state.apply_tick(url_err(), text("x"), POLICY);
        assert!(outcome.errors.is_empty());
        assert!(!state.suppression().is_forwarded(ErrorCategory::Script));

        let outcome = state.apply_tick(url_err(), script_err(), POLICY);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].category(), Some(ErrorCategory::Script));
    }

    #[test]
    fn test_fetch_failure_resolves_url_episode() {
        let mut state = RecognitionState::default();
        state.apply_tick(url_err(), None, POLICY);
        assert!(state.suppression().is_forwarded(ErrorCategory::Url));

        state.apply_tick(fetch_err(), None, POLICY);
        assert!(!state.suppression().is_forwarded(ErrorCategory::Url));
        assert_eq!(state.apply_tick(url_err(), None, POLICY).errors.len(), 1);
    }

    #[test]
    fn test_sole_source_failures_always_reported() {
        let policy = TickPolicy { allow_no_song: false, report_sole_source_failures: true };
        let mut state = RecognitionState::default();

        assert_eq!(state.apply_tick(fetch_err(), None, policy).errors.len(), 1);
        assert_eq!(state.apply_tick(fetch_err(), None, policy).errors.len(), 1);

        // Not the sole source any more: suppression applies again.
        assert_eq!(state.apply_tick(fetch_err(), text("x"), policy).errors.len(), 0);
    }

    #[test]
    fn test_reset_run_forgets_episode_and_cache() {
        let mut state = RecognitionState::default();
        state.apply_tick(json(Some(song("A"))), None, POLICY);
        state.apply_tick(fetch_err(), None, POLICY);

        state.reset_run();
        assert!(!state.suppression().is_forwarded(ErrorCategory::Fetch));
        assert_eq!(state.current(), Some(&song("A")));
        assert_eq!(state.apply_tick(fetch_err(), None, POLICY).errors.len(), 1);
    }
}
