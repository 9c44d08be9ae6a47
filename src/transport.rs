use crate::audio::{MediaSink, SinkEvent};
use crate::model::{CandidateFile, PlaybackState, PlaylistId, RepeatMode, Settings};
use crate::policy::{self, Decision, OrderContext};
use crate::store::{self, PlaylistStore};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;
use std::time::Duration;

/// Playback progress as last reported by the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Progress {
    pub position: Duration,
    pub duration: Option<Duration>,
}

impl Progress {
    /// Percent of the track played, for a seek bar. `None` until the
    /// duration is known.
    pub fn percent(&self) -> Option<f64> {
        let duration = self.duration.filter(|duration| !duration.is_zero())?;
        let percent = self.position.as_secs_f64() / duration.as_secs_f64() * 100.0;
        Some(percent.clamp(0.0, 100.0))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlaylistSummary {
    pub id: PlaylistId,
    pub name: String,
    pub track_count: usize,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlayerSnapshot {
    pub playlists: Vec<PlaylistSummary>,
    pub selected_playlist: PlaylistId,
    pub tracks: Vec<String>,
    pub current_track_index: Option<usize>,
    pub current_track: Option<String>,
    pub is_playing: bool,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub position_seconds: f64,
    pub duration_seconds: Option<f64>,
    pub progress_percent: Option<f64>,
    pub volume: f32,
}

/// Owns the playlists, the playback state and the media sink.
///
/// Every command is total: anything that makes no sense for the current
/// state (no tracks, bad index, nothing loaded) leaves the state untouched.
pub struct Transport<S: MediaSink> {
    store: PlaylistStore,
    state: PlaybackState,
    sink: S,
    progress: Progress,
    rng: SmallRng,
}

impl<S: MediaSink> Transport<S> {
    pub fn new(sink: S, settings: &Settings) -> Self {
        Self::with_rng(sink, settings, SmallRng::from_os_rng())
    }

    pub fn with_rng(mut sink: S, settings: &Settings, rng: SmallRng) -> Self {
        sink.set_volume(settings.volume);
        Self {
            store: PlaylistStore::new(&settings.default_playlist_name),
            state: PlaybackState {
                shuffle_enabled: settings.shuffle,
                repeat_mode: settings.repeat_mode,
                ..PlaybackState::default()
            },
            sink,
            progress: Progress::default(),
            rng,
        }
    }

    pub fn store(&self) -> &PlaylistStore {
        &self.store
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn create_playlist(&mut self, name: &str, select: bool) -> PlaylistId {
        let before = self.store.selected_id();
        let id = self.store.create_playlist(name, select);
        log::info!("created playlist {id}");
        if self.store.selected_id() != before {
            self.invalidate_current(true);
        }
        id
    }

    pub fn select_playlist(&mut self, id: PlaylistId) -> bool {
        if !self.store.select_playlist(id) {
            return false;
        }
        self.invalidate_current(true);
        true
    }

    pub fn delete_playlist(&mut self, id: PlaylistId) -> bool {
        let before = self.store.selected_id();
        let Some(removed) = self.store.delete_playlist(id) else {
            log::debug!("refused to delete playlist {id}");
            return false;
        };
        log::info!(
            "deleted playlist {} with {} tracks",
            removed.id,
            removed.tracks.len()
        );
        if self.store.selected_id() != before {
            self.invalidate_current(true);
        }
        true
    }

    pub fn add_tracks(
        &mut self,
        id: PlaylistId,
        candidates: impl IntoIterator<Item = CandidateFile>,
    ) -> usize {
        let added = self.store.add_tracks(id, candidates);
        log::debug!("added {added} tracks to playlist {id}");
        added
    }

    pub fn add_to_selected(
        &mut self,
        candidates: impl IntoIterator<Item = CandidateFile>,
    ) -> usize {
        self.add_tracks(self.store.selected_id(), candidates)
    }

    pub fn remove_track(&mut self, id: PlaylistId, index: usize) -> bool {
        if self.store.remove_track(id, index).is_none() {
            return false;
        }
        if id != self.store.selected_id() {
            return true;
        }

        let was_current = self.state.current_track_index == Some(index);
        self.state.current_track_index =
            store::index_after_removal(self.state.current_track_index, index);
        self.state.shuffle_history = self
            .state
            .shuffle_history
            .iter()
            .filter_map(|entry| store::index_after_removal(Some(*entry), index))
            .collect();
        if was_current {
            self.invalidate_current(false);
        }
        true
    }

    pub fn reorder_track(&mut self, id: PlaylistId, from: usize, to: usize) -> bool {
        if !self.store.reorder_track(id, from, to) {
            return false;
        }
        if id == self.store.selected_id() {
            self.state.current_track_index = self
                .state
                .current_track_index
                .map(|current| store::index_after_reorder(current, from, to));
            for entry in &mut self.state.shuffle_history {
                *entry = store::index_after_reorder(*entry, from, to);
            }
        }
        true
    }

    pub fn play_track_at(&mut self, index: usize) {
        let Some(source) = self
            .store
            .selected()
            .and_then(|playlist| playlist.tracks.get(index))
            .map(|track| track.source.clone())
        else {
            log::debug!("ignored play request for index {index}");
            return;
        };

        self.state.current_track_index = Some(index);
        self.progress = Progress::default();
        match self.sink.load(&source) {
            Ok(()) => {
                self.sink.play();
                self.state.is_playing = true;
                self.progress.duration = self.sink.duration();
            }
            Err(err) => {
                log::warn!("failed to load {}: {err:#}", source.path().display());
                self.state.is_playing = false;
            }
        }
    }

    pub fn toggle_play_pause(&mut self) {
        if !self.sink.is_loaded() {
            if self
                .store
                .selected()
                .is_some_and(|playlist| !playlist.tracks.is_empty())
            {
                self.play_track_at(0);
            }
            return;
        }

        if self.sink.is_paused() {
            self.sink.play();
            self.state.is_playing = true;
        } else {
            self.sink.pause();
            self.state.is_playing = false;
        }
    }

    /// Pauses and rewinds. The current index is kept.
    pub fn stop(&mut self) {
        self.sink.pause();
        if self.sink.is_loaded()
            && let Err(err) = self.sink.set_position(Duration::ZERO)
        {
            log::warn!("failed to rewind: {err:#}");
        }
        self.progress.position = Duration::ZERO;
        self.state.is_playing = false;
    }

    pub fn advance(&mut self) {
        if self.store.selected().is_none() {
            return;
        }
        let decision = policy::decide_next(
            self.order_context(),
            &mut self.state.shuffle_history,
            &mut self.rng,
        );
        self.apply(decision);
    }

    pub fn retreat(&mut self) {
        if self.store.selected().is_none() {
            return;
        }
        let decision =
            policy::decide_previous(self.order_context(), &mut self.state.shuffle_history);
        self.apply(decision);
    }

    /// Moves the playhead by `delta_seconds`, clamped to the track.
    ///
    /// Until the sink knows the duration only the lower bound applies, so
    /// seeking forward works before metadata arrives. A target too large to
    /// represent is ignored.
    pub fn seek_relative(&mut self, delta_seconds: f64) {
        if !self.sink.is_loaded() || !delta_seconds.is_finite() {
            return;
        }
        let mut target = (self.sink.position().as_secs_f64() + delta_seconds).max(0.0);
        if let Some(duration) = self.sink.duration() {
            target = target.min(duration.as_secs_f64());
        }
        let Ok(target) = Duration::try_from_secs_f64(target) else {
            log::debug!("ignored seek to {target}s");
            return;
        };
        self.seek_to(target);
    }

    /// `fraction` is in `0.0..=1.0` and is clamped to it.
    pub fn seek_to_fraction(&mut self, fraction: f64) {
        let Some(duration) = self.sink.duration().filter(|duration| !duration.is_zero()) else {
            return;
        };
        if !self.sink.is_loaded() || !fraction.is_finite() {
            return;
        }
        self.seek_to(duration.mul_f64(fraction.clamp(0.0, 1.0)));
    }

    pub fn volume(&self) -> f32 {
        self.sink.volume()
    }

    pub fn set_volume(&mut self, volume: f32) {
        if volume.is_finite() {
            self.sink.set_volume(volume.clamp(0.0, 1.0));
        }
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.state.shuffle_enabled = !self.state.shuffle_enabled;
        self.state.shuffle_history.clear();
        self.state.shuffle_enabled
    }

    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        self.state.repeat_mode = self.state.repeat_mode.next();
        self.state.repeat_mode
    }

    pub fn handle_sink_event(&mut self, event: SinkEvent) {
        match event {
            SinkEvent::PositionChanged(position) => self.progress.position = position,
            SinkEvent::DurationKnown(duration) => self.progress.duration = Some(duration),
            SinkEvent::Ended => {
                log::debug!("track ended");
                self.advance();
            }
        }
    }

    pub fn pump_sink_events(&mut self) {
        for event in self.sink.poll_events() {
            self.handle_sink_event(event);
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let selected = self.store.selected();
        let current_track = self
            .state
            .current_track_index
            .and_then(|index| selected?.tracks.get(index))
            .map(|track| track.name.clone());
        PlayerSnapshot {
            playlists: self
                .store
                .playlists()
                .iter()
                .map(|playlist| PlaylistSummary {
                    id: playlist.id,
                    name: playlist.name.clone(),
                    track_count: playlist.tracks.len(),
                    selected: playlist.id == self.store.selected_id(),
                })
                .collect(),
            selected_playlist: self.store.selected_id(),
            tracks: selected
                .map(|playlist| playlist.tracks.iter().map(|track| track.name.clone()).collect())
                .unwrap_or_default(),
            current_track_index: self.state.current_track_index,
            current_track,
            is_playing: self.state.is_playing,
            shuffle: self.state.shuffle_enabled,
            repeat: self.state.repeat_mode,
            position_seconds: self.progress.position.as_secs_f64(),
            duration_seconds: self.progress.duration.map(|duration| duration.as_secs_f64()),
            progress_percent: self.progress.percent(),
            volume: self.sink.volume(),
        }
    }

    fn order_context(&self) -> OrderContext {
        OrderContext {
            track_count: self
                .store
                .selected()
                .map_or(0, |playlist| playlist.tracks.len()),
            current: self.state.current_track_index,
            repeat: self.state.repeat_mode,
            shuffle: self.state.shuffle_enabled,
        }
    }

    fn apply(&mut self, decision: Decision) {
        log::debug!("order decision: {decision:?}");
        match decision {
            Decision::PlayIndex(index) => self.play_track_at(index),
            Decision::Restart => {
                if !self.sink.is_loaded() {
                    return;
                }
                self.seek_to(Duration::ZERO);
                self.sink.play();
                self.state.is_playing = true;
            }
            Decision::Stop => self.stop(),
            Decision::NoAction => {}
        }
    }

    fn seek_to(&mut self, position: Duration) {
        match self.sink.set_position(position) {
            Ok(()) => self.progress.position = position,
            Err(err) => log::warn!("seek failed: {err:#}"),
        }
    }

    /// Forgets the current track and releases it from the sink.
    fn invalidate_current(&mut self, clear_history: bool) {
        self.sink.pause();
        self.sink.unload();
        self.state.current_track_index = None;
        self.state.is_playing = false;
        if clear_history {
            self.state.shuffle_history.clear();
        }
        self.progress = Progress::default();
    }
}

pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return String::from("0:00");
    }
    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}
