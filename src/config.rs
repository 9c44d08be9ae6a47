use crate::model::Settings;
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "tunedeck";
const SETTINGS_FILE: &str = "settings.json";
const DIR_OVERRIDE_VAR: &str = "TUNEDECK_CONFIG_DIR";

/// Location of the settings file for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    /// `$TUNEDECK_CONFIG_DIR/settings.json`, falling back to
    /// `~/.config/tunedeck/settings.json`.
    pub fn locate() -> Result<Self> {
        Ok(Self::in_dir(config_root()?))
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(SETTINGS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file yields the defaults. Out-of-range values are repaired.
    pub fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            log::debug!("no settings at {}", self.path.display());
            return Ok(Settings::default());
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read settings file {}", self.path.display()))?;
        let settings: Settings = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse settings file {}", self.path.display()))?;
        Ok(sanitize(settings))
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        log::info!("saved settings to {}", self.path.display());
        Ok(())
    }
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var(DIR_OVERRIDE_VAR) {
        return Ok(PathBuf::from(override_dir));
    }

    let home_var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    let home = env::var(home_var).with_context(|| format!("{home_var} is not set"))?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn load_settings() -> Result<Settings> {
    SettingsFile::locate()?.load()
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    SettingsFile::locate()?.save(settings)
}

fn sanitize(mut settings: Settings) -> Settings {
    let defaults = Settings::default();
    settings.volume = if settings.volume.is_finite() {
        settings.volume.clamp(0.0, 1.0)
    } else {
        defaults.volume
    };
    if settings.seek_step_seconds == 0 {
        settings.seek_step_seconds = defaults.seek_step_seconds;
    }
    if settings.default_playlist_name.trim().is_empty() {
        settings.default_playlist_name = defaults.default_playlist_name;
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RepeatMode;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().expect("tempdir");
        let file = SettingsFile::in_dir(dir.path().join("nested"));

        let settings = Settings {
            repeat_mode: RepeatMode::All,
            seek_step_seconds: 15,
            shuffle: true,
            ..Settings::default()
        };
        file.save(&settings).expect("save");
        assert_eq!(file.load().expect("load"), settings);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempdir().expect("tempdir");
        let file = SettingsFile::in_dir(dir.path());
        assert_eq!(file.load().expect("load"), Settings::default());
    }

    #[test]
    fn out_of_range_values_are_repaired() {
        let dir = tempdir().expect("tempdir");
        let file = SettingsFile::in_dir(dir.path());
        fs::write(
            file.path(),
            r#"{"volume":4.5,"seek_step_seconds":0,"default_playlist_name":"  "}"#,
        )
        .expect("write");

        let loaded = file.load().expect("load");
        assert_eq!(loaded.volume, 1.0);
        assert_eq!(loaded.seek_step_seconds, 10);
        assert_eq!(loaded.default_playlist_name, "All Tracks");
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let file = SettingsFile::in_dir(dir.path());
        fs::write(file.path(), "{not json").expect("write");

        let err = file.load().expect_err("parse error");
        assert!(err.to_string().contains("failed to parse settings file"));
    }
}
