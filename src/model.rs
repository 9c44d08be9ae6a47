use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use uuid::Uuid;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "aac"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PlaylistId(Uuid);

impl PlaylistId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlaylistId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TrackId(Uuid);

impl TrackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Shared reference to a decodable audio resource.
///
/// The owning [`Track`] and whichever sink currently has it loaded each hold
/// a clone. Once both let go the resource is reclaimed, which a
/// [`SourceWatch`] can observe.
#[derive(Debug, Clone)]
pub struct SourceHandle(Arc<Path>);

impl SourceHandle {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        Self(Arc::from(path))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn watch(&self) -> SourceWatch {
        SourceWatch(Arc::downgrade(&self.0))
    }
}

impl PartialEq for SourceHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone)]
pub struct SourceWatch(Weak<Path>);

impl SourceWatch {
    pub fn is_released(&self) -> bool {
        self.0.strong_count() == 0
    }
}

#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub source: SourceHandle,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, source: SourceHandle) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    pub fn is_supported(&self) -> bool {
        is_supported_file_name(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub source: SourceHandle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::One,
            Self::One => Self::All,
            Self::All => Self::Off,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::One => "one",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackState {
    pub current_track_index: Option<usize>,
    pub is_playing: bool,
    pub shuffle_enabled: bool,
    pub repeat_mode: RepeatMode,
    /// Previously visited indices, most recent last.
    pub shuffle_history: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_seek_step_seconds")]
    pub seek_step_seconds: u16,
    #[serde(default = "default_playlist_name")]
    pub default_playlist_name: String,
    #[serde(default)]
    pub repeat_mode: RepeatMode,
    #[serde(default)]
    pub shuffle: bool,
}

fn default_volume() -> f32 {
    1.0
}

fn default_seek_step_seconds() -> u16 {
    10
}

fn default_playlist_name() -> String {
    String::from("All Tracks")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            seek_step_seconds: default_seek_step_seconds(),
            default_playlist_name: default_playlist_name(),
            repeat_mode: RepeatMode::default(),
            shuffle: false,
        }
    }
}

pub fn is_supported_file_name(name: &str) -> bool {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return false;
    };
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}
