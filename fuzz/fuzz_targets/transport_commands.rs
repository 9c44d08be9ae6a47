#![no_main]

use libfuzzer_sys::fuzz_target;
use tunedeck::audio::NullMediaSink;
use tunedeck::model::{CandidateFile, Settings, SourceHandle};
use tunedeck::transport::Transport;

fuzz_target!(|data: &[u8]| {
    let mut transport = Transport::new(NullMediaSink::new(), &Settings::default());

    for pair in data.chunks(2) {
        let op = pair[0];
        let arg = usize::from(pair.get(1).copied().unwrap_or_default() % 8);
        let selected = transport.store().selected_id();
        match op % 14 {
            0 => {
                let name = format!("track_{arg}.{}", ["mp3", "wav", "txt"][arg % 3]);
                let source = SourceHandle::from_path(name.clone());
                transport.add_to_selected([CandidateFile::new(name, source)]);
            }
            1 => {
                transport.remove_track(selected, arg);
            }
            2 => {
                transport.reorder_track(selected, arg, arg / 2);
            }
            3 => transport.play_track_at(arg),
            4 => transport.toggle_play_pause(),
            5 => transport.stop(),
            6 => transport.advance(),
            7 => transport.retreat(),
            8 => {
                transport.toggle_shuffle();
            }
            9 => {
                transport.cycle_repeat_mode();
            }
            10 => {
                transport.create_playlist("fuzz", arg % 2 == 0);
            }
            11 => {
                let id = transport.store().playlists().get(arg).map(|playlist| playlist.id);
                if let Some(id) = id {
                    transport.delete_playlist(id);
                }
            }
            12 => {
                let id = transport.store().playlists().get(arg).map(|playlist| playlist.id);
                if let Some(id) = id {
                    transport.select_playlist(id);
                }
            }
            _ => transport.seek_relative(arg as f64 - 4.0),
        }

        assert!(!transport.store().is_empty());
        let track_count = transport
            .store()
            .selected()
            .map_or(0, |playlist| playlist.tracks.len());
        if let Some(current) = transport.state().current_track_index {
            assert!(current < track_count);
        }
        let history = &transport.state().shuffle_history;
        assert!(history.iter().all(|idx| *idx < track_count));
    }
});
