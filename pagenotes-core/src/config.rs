//! Persisted viewer settings, seeding the transient per-view state.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::view::LayoutOrientation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Debounce delay between the last edit and the autosave write.
    pub autosave_delay_ms: u64,
    pub scale: f32,
    pub orientation: LayoutOrientation,
    pub show_pdf: bool,
    pub show_notes: bool,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            autosave_delay_ms: 1000,
            scale: 1.0,
            orientation: LayoutOrientation::Right,
            show_pdf: true,
            show_notes: true,
        }
    }
}

impl ViewerSettings {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Platform settings path, e.g. `~/.config/pagenotes/settings.toml`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("net", "pagenotes", "pagenotes")
            .map(|dirs| dirs.config_dir().join("settings.toml"))
    }

    /// Loads settings from a TOML file. A missing file is the common case
    /// and yields defaults silently; unreadable or invalid content yields
    /// defaults with a warning.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                warn!(%err, path = %path.display(), "failed to read settings");
                return Self::default();
            }
        };
        match toml::from_str(&raw) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(%err, path = %path.display(), "invalid settings, using defaults");
                Self::default()
            }
        }
    }
}
