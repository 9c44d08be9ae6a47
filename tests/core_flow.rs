use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::time::Duration;
use tunedeck::audio::{MediaSink, SinkEvent};
use tunedeck::model::{CandidateFile, RepeatMode, Settings, SourceHandle};
use tunedeck::transport::Transport;

#[derive(Default)]
struct ScriptedSink {
    loaded: Option<SourceHandle>,
    paused: bool,
    position: Duration,
    volume: f32,
    loads: Vec<String>,
    pending: Vec<SinkEvent>,
}

impl MediaSink for ScriptedSink {
    fn load(&mut self, source: &SourceHandle) -> Result<()> {
        self.loaded = Some(source.clone());
        self.paused = true;
        self.position = Duration::ZERO;
        self.loads.push(source.path().display().to_string());
        Ok(())
    }

    fn unload(&mut self) {
        self.loaded = None;
    }

    fn play(&mut self) {
        self.paused = false;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    fn position(&self) -> Duration {
        self.position
    }

    fn set_position(&mut self, position: Duration) -> Result<()> {
        self.position = position;
        Ok(())
    }

    fn duration(&self) -> Option<Duration> {
        Some(Duration::from_secs(180))
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn poll_events(&mut self) -> Vec<SinkEvent> {
        std::mem::take(&mut self.pending)
    }
}

fn candidates(names: &[&str]) -> Vec<CandidateFile> {
    names
        .iter()
        .map(|name| CandidateFile::new(*name, SourceHandle::from_path(*name)))
        .collect()
}

fn deck(names: &[&str]) -> Transport<ScriptedSink> {
    let mut transport = Transport::with_rng(
        ScriptedSink::default(),
        &Settings::default(),
        SmallRng::seed_from_u64(42),
    );
    transport.add_to_selected(candidates(names));
    transport
}

#[test]
fn repeat_all_wraps_from_last_to_first() {
    let mut transport = deck(&["A.mp3", "B.mp3", "C.mp3"]);
    transport.cycle_repeat_mode();
    transport.cycle_repeat_mode();
    assert_eq!(transport.state().repeat_mode, RepeatMode::All);

    transport.play_track_at(2);
    transport.advance();

    assert_eq!(transport.state().current_track_index, Some(0));
    assert_eq!(transport.sink().loads, vec!["C.mp3", "A.mp3"]);
}

#[test]
fn removing_earlier_track_keeps_current_playing() {
    let mut transport = deck(&["A.mp3", "B.mp3", "C.mp3"]);
    transport.play_track_at(2);
    let id = transport.store().selected_id();

    assert!(transport.remove_track(id, 1));

    assert_eq!(transport.state().current_track_index, Some(1));
    assert!(transport.state().is_playing);
    assert_eq!(transport.snapshot().current_track.as_deref(), Some("C.mp3"));
    assert_eq!(transport.sink().loads, vec!["C.mp3"]);
}

#[test]
fn repeat_one_restarts_regardless_of_shuffle() {
    for shuffle in [false, true] {
        let mut transport = deck(&["A.mp3", "B.mp3", "C.mp3"]);
        if shuffle {
            transport.toggle_shuffle();
        }
        transport.cycle_repeat_mode();
        transport.play_track_at(1);

        for _ in 0..5 {
            transport.sink_mut().position = Duration::from_secs(90);
            transport.advance();
            assert_eq!(transport.state().current_track_index, Some(1));
            assert_eq!(transport.sink().position, Duration::ZERO);
        }
        assert_eq!(transport.sink().loads.len(), 1);
        assert!(transport.state().shuffle_history.is_empty());
    }
}

#[test]
fn natural_end_follows_the_same_path_as_next() {
    let mut transport = deck(&["A.mp3", "B.mp3"]);
    transport.play_track_at(0);

    transport.sink_mut().pending.push(SinkEvent::Ended);
    transport.pump_sink_events();
    assert_eq!(transport.state().current_track_index, Some(1));

    transport.sink_mut().pending.push(SinkEvent::Ended);
    transport.pump_sink_events();
    assert_eq!(transport.state().current_track_index, Some(1));
    assert!(!transport.state().is_playing);
}

#[test]
fn single_track_shuffle_loops_forever() {
    let mut transport = deck(&["A.mp3"]);
    transport.toggle_shuffle();
    transport.play_track_at(0);

    for _ in 0..3 {
        transport.advance();
        assert_eq!(transport.state().current_track_index, Some(0));
        assert!(transport.state().is_playing);
    }
}

#[test]
fn unsupported_files_are_dropped_silently() {
    let mut transport = deck(&[]);
    let added = transport.add_to_selected(candidates(&[
        "one.mp3",
        "readme.md",
        "two.WAV",
        "art.jpeg",
        "three.Aac",
    ]));

    assert_eq!(added, 3);
    assert_eq!(
        transport.snapshot().tracks,
        vec!["one.mp3", "two.WAV", "three.Aac"]
    );
}

#[test]
fn deleting_selected_playlist_releases_loaded_track() {
    let mut transport = deck(&[]);
    let first = transport.store().selected_id();
    let mixtape = transport.create_playlist("Mixtape", true);
    let files = candidates(&["A.mp3"]);
    let watch = files[0].source.watch();
    transport.add_tracks(mixtape, files);
    transport.play_track_at(0);

    assert!(transport.delete_playlist(mixtape));
    assert_eq!(transport.store().selected_id(), first);
    assert_eq!(transport.state().current_track_index, None);
    assert!(watch.is_released());
    assert!(!transport.delete_playlist(first));
}

#[test]
fn previous_after_reorder_still_names_visited_track() {
    let mut transport = deck(&["A.mp3", "B.mp3", "C.mp3", "D.mp3"]);
    transport.toggle_shuffle();
    transport.play_track_at(0);
    transport.advance();
    let id = transport.store().selected_id();

    transport.reorder_track(id, 0, 3);
    transport.retreat();

    assert_eq!(transport.snapshot().current_track.as_deref(), Some("A.mp3"));
}
