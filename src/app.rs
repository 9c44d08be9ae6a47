use crate::audio::{MediaSink, NullMediaSink, RodioMediaSink};
use crate::config;
use crate::library;
use crate::model::Settings;
use crate::transport::{Transport, format_time};
use anyhow::Result;
use std::io::{BufRead, Write, stdin, stdout};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Default, Clone)]
pub struct AppStartupOptions {
    pub preload: Vec<PathBuf>,
    pub null_audio: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue(String),
    Quit,
}

pub fn run_with_startup(options: AppStartupOptions) -> Result<()> {
    let mut settings = match config::load_settings() {
        Ok(settings) => settings,
        Err(err) => {
            log::warn!("using default settings: {err:#}");
            Settings::default()
        }
    };

    let sink: Box<dyn MediaSink> = if options.null_audio {
        Box::new(NullMediaSink::new())
    } else {
        match RodioMediaSink::new() {
            Ok(sink) => Box::new(sink),
            Err(err) => {
                log::warn!("falling back to silent playback: {err:#}");
                Box::new(NullMediaSink::new())
            }
        }
    };
    let mut transport = Transport::new(sink, &settings);
    if !options.preload.is_empty() {
        let added = transport.add_to_selected(library::candidates_from_paths(&options.preload));
        println!("Added {added} tracks");
    }

    let (lines_tx, lines_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if lines_tx.send(line).is_err() {
                break;
            }
        }
    });

    prompt()?;
    loop {
        transport.pump_sink_events();
        match lines_rx.recv_timeout(TICK) {
            Ok(line) => match run_command(&mut transport, &mut settings, &line) {
                CommandOutcome::Continue(status) => {
                    println!("{status}");
                    prompt()?;
                }
                CommandOutcome::Quit => break,
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    capture_settings(&transport, &mut settings);
    config::save_settings(&settings)
}

fn prompt() -> Result<()> {
    let mut out = stdout();
    write!(out, "> ")?;
    out.flush()?;
    Ok(())
}

fn capture_settings<S: MediaSink>(transport: &Transport<S>, settings: &mut Settings) {
    settings.volume = transport.volume();
    settings.repeat_mode = transport.state().repeat_mode;
    settings.shuffle = transport.state().shuffle_enabled;
}

pub fn run_command<S: MediaSink>(
    transport: &mut Transport<S>,
    settings: &mut Settings,
    raw: &str,
) -> CommandOutcome {
    let input = raw.trim();
    if input.is_empty() {
        return CommandOutcome::Continue(String::from("No command"));
    }

    let mut command_split = input.splitn(2, char::is_whitespace);
    let command = command_split.next().unwrap_or_default();
    let rest = command_split.next().unwrap_or("").trim();

    let status = match command {
        "help" => String::from(
            "Commands: playlists | tracks | new <name> | open <n> | delete <n> | add <path> | play [n] | toggle | stop | next | prev | fwd | back | seek <percent> | vol <percent> | shuffle | repeat | rm <n> | mv <from> <to> | status | save | quit",
        ),
        "playlists" => list_playlists(transport),
        "tracks" => list_tracks(transport),
        "new" => {
            if rest.is_empty() {
                return CommandOutcome::Continue(String::from("Usage: new <name>"));
            }
            let id = transport.create_playlist(rest, true);
            let name = transport
                .store()
                .get(id)
                .map(|playlist| playlist.name.clone())
                .unwrap_or_default();
            format!("Created playlist {name}")
        }
        "open" => match playlist_arg(transport, rest) {
            Some(id) if transport.select_playlist(id) => String::from("Opened playlist"),
            Some(_) => String::from("Playlist already open"),
            None => String::from("Usage: open <n>"),
        },
        "delete" => match playlist_arg(transport, rest) {
            Some(id) if transport.delete_playlist(id) => String::from("Deleted playlist"),
            Some(_) => String::from("Cannot delete the only playlist"),
            None => String::from("Usage: delete <n>"),
        },
        "add" => {
            if rest.is_empty() {
                String::from("Usage: add <path>")
            } else {
                let candidates = library::candidates_from_paths(&[PathBuf::from(rest)]);
                let added = transport.add_to_selected(candidates);
                format!("Added {added} tracks")
            }
        }
        "play" => {
            if rest.is_empty() {
                transport.toggle_play_pause();
            } else if let Some(index) = index_arg(rest) {
                transport.play_track_at(index);
            } else {
                return CommandOutcome::Continue(String::from("Usage: play [n]"));
            }
            now_playing(transport)
        }
        "toggle" | "pause" => {
            transport.toggle_play_pause();
            now_playing(transport)
        }
        "stop" => {
            transport.stop();
            String::from("Stopped")
        }
        "next" => {
            transport.advance();
            now_playing(transport)
        }
        "prev" => {
            transport.retreat();
            now_playing(transport)
        }
        "fwd" => {
            transport.seek_relative(f64::from(settings.seek_step_seconds));
            position_line(transport)
        }
        "back" => {
            transport.seek_relative(-f64::from(settings.seek_step_seconds));
            position_line(transport)
        }
        "seek" => match rest.parse::<f64>() {
            Ok(percent) => {
                transport.seek_to_fraction(percent / 100.0);
                position_line(transport)
            }
            Err(_) => String::from("Usage: seek <percent>"),
        },
        "vol" => match rest.parse::<f32>() {
            Ok(percent) => {
                transport.set_volume(percent / 100.0);
                format!("Volume: {}%", (transport.volume() * 100.0).round() as u16)
            }
            Err(_) => String::from("Usage: vol <percent>"),
        },
        "shuffle" => {
            if transport.toggle_shuffle() {
                String::from("Shuffle on")
            } else {
                String::from("Shuffle off")
            }
        }
        "repeat" => format!("Repeat: {}", transport.cycle_repeat_mode().label()),
        "rm" => match index_arg(rest) {
            Some(index) => {
                let id = transport.store().selected_id();
                if transport.remove_track(id, index) {
                    String::from("Removed track")
                } else {
                    String::from("No such track")
                }
            }
            None => String::from("Usage: rm <n>"),
        },
        "mv" => {
            let mut parts = rest.split_whitespace().map(index_arg);
            match (parts.next().flatten(), parts.next().flatten()) {
                (Some(from), Some(to)) => {
                    let id = transport.store().selected_id();
                    if transport.reorder_track(id, from, to) {
                        String::from("Moved track")
                    } else {
                        String::from("Nothing moved")
                    }
                }
                _ => String::from("Usage: mv <from> <to>"),
            }
        }
        "status" => match serde_json::to_string_pretty(&transport.snapshot()) {
            Ok(json) => json,
            Err(err) => format!("status error: {err}"),
        },
        "save" => {
            capture_settings(transport, settings);
            match config::save_settings(settings) {
                Ok(()) => String::from("Settings saved"),
                Err(err) => format!("save error: {err:#}"),
            }
        }
        "quit" | "exit" => return CommandOutcome::Quit,
        _ => String::from("Unknown command. Use help"),
    };
    CommandOutcome::Continue(status)
}

/// Parses a 1-based number from the UI into a 0-based index.
fn index_arg(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok()?.checked_sub(1)
}

fn playlist_arg<S: MediaSink>(
    transport: &Transport<S>,
    raw: &str,
) -> Option<crate::model::PlaylistId> {
    let index = index_arg(raw)?;
    transport
        .store()
        .playlists()
        .get(index)
        .map(|playlist| playlist.id)
}

fn list_playlists<S: MediaSink>(transport: &Transport<S>) -> String {
    let selected = transport.store().selected_id();
    transport
        .store()
        .playlists()
        .iter()
        .enumerate()
        .map(|(idx, playlist)| {
            let marker = if playlist.id == selected { '*' } else { ' ' };
            format!(
                "{marker}{}. {} ({})",
                idx + 1,
                playlist.name,
                playlist.tracks.len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn list_tracks<S: MediaSink>(transport: &Transport<S>) -> String {
    let Some(playlist) = transport.store().selected() else {
        return String::from("No playlist selected");
    };
    let count = playlist.tracks.len();
    let mut lines = vec![format!(
        "{}: {count} track{}",
        playlist.name,
        if count == 1 { "" } else { "s" }
    )];
    let current = transport.state().current_track_index;
    lines.extend(playlist.tracks.iter().enumerate().map(|(idx, track)| {
        let marker = if current == Some(idx) { '>' } else { ' ' };
        format!("{marker}{}. {}", idx + 1, track.name)
    }));
    lines.join("\n")
}

fn now_playing<S: MediaSink>(transport: &Transport<S>) -> String {
    let snapshot = transport.snapshot();
    match snapshot.current_track {
        Some(name) if snapshot.is_playing => format!("Playing: {name}"),
        Some(name) => format!("Paused: {name}"),
        None => String::from("Nothing playing"),
    }
}

fn position_line<S: MediaSink>(transport: &Transport<S>) -> String {
    let progress = transport.progress();
    let position = transport
        .sink()
        .position()
        .as_secs_f64()
        .max(progress.position.as_secs_f64());
    let total = progress
        .duration
        .or(transport.sink().duration())
        .map_or(0.0, |duration| duration.as_secs_f64());
    format!("{} / {}", format_time(position), format_time(total))
}
