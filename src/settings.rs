use anyhow::Context;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::actions::{ActionTable, default_shortcuts};
use crate::layout::{DEFAULT_SMART_THRESHOLD, ZoomMode};
use crate::navigation::{KeyBindings, ReadingDirection};
use crate::platform::ViewportMetrics;
use crate::preload::DEFAULT_FORWARD_BUFFER;
use crate::surface::MAX_CHUNK_HEIGHT;
use crate::viewer::ViewerConfig;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const BOOKMARKS_FILENAME: &str = "bookmarks.json";
const APP_NAME: &str = "comicokrat";

/// Size of the virtual page viewport in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    pub width: u32,
    pub height: u32,
    pub pixel_density: f32,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            pixel_density: 1.0,
        }
    }
}

impl ViewportSettings {
    pub fn metrics(&self) -> ViewportMetrics {
        ViewportMetrics::new(self.width, self.height, self.pixel_density)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub zoom_mode: ZoomMode,

    #[serde(default)]
    pub reading_direction: ReadingDirection,

    #[serde(default = "default_forward_buffer")]
    pub forward_buffer: i32,

    #[serde(default = "default_smart_threshold")]
    pub smart_threshold: f32,

    #[serde(default = "default_max_chunk_height")]
    pub max_chunk_height: u32,

    #[serde(default)]
    pub key_bindings: KeyBindings,

    /// Toolbar action shortcuts, key to action name
    #[serde(default = "default_shortcuts")]
    pub shortcuts: BTreeMap<char, String>,

    #[serde(default)]
    pub viewport: ViewportSettings,

    /// Reopen books at the last page read
    #[serde(default = "default_true")]
    pub remember_position: bool,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_forward_buffer() -> i32 {
    DEFAULT_FORWARD_BUFFER
}

fn default_smart_threshold() -> f32 {
    DEFAULT_SMART_THRESHOLD
}

fn default_max_chunk_height() -> u32 {
    MAX_CHUNK_HEIGHT
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            zoom_mode: ZoomMode::default(),
            reading_direction: ReadingDirection::default(),
            forward_buffer: default_forward_buffer(),
            smart_threshold: default_smart_threshold(),
            max_chunk_height: default_max_chunk_height(),
            key_bindings: KeyBindings::default(),
            shortcuts: default_shortcuts(),
            viewport: ViewportSettings::default(),
            remember_position: true,
        }
    }
}

pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME))
}

pub fn preferred_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(SETTINGS_FILENAME))
}

pub fn bookmarks_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(BOOKMARKS_FILENAME))
}

impl Settings {
    /// Load from the default location, writing defaults there when the file
    /// does not exist yet. Unreadable files fall back to defaults.
    pub fn load() -> Self {
        let Some(path) = preferred_config_path() else {
            warn!("Could not determine config directory, using default settings");
            return Self::default();
        };
        if path.exists() {
            Self::load_from_path(&path).unwrap_or_else(|e| {
                error!("{e:#}");
                Self::default()
            })
        } else {
            info!("Settings file not found, creating with defaults at {path:?}");
            let settings = Self::default();
            if let Err(e) = settings.save_to_path(&path) {
                error!("{e:#}");
            }
            settings
        }
    }

    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {path:?}"))?;
        let mut settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {path:?}"))?;
        debug!("Loaded settings from {path:?}");

        if settings.version < CURRENT_VERSION {
            settings.migrate();
            if let Err(e) = settings.save_to_path(path) {
                error!("{e:#}");
            }
        }
        Ok(settings)
    }

    pub fn save_to_path(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory {parent:?}"))?;
            }
        }

        let mut content = String::from(SETTINGS_HEADER);
        content.push_str(&serde_yaml::to_string(self)?);
        fs::write(path, content).with_context(|| format!("Failed to save settings to {path:?}"))?;
        debug!("Saved settings to {path:?}");
        Ok(())
    }

    fn migrate(&mut self) {
        info!(
            "Migrating settings from v{} to v{}",
            self.version, CURRENT_VERSION
        );

        // Version-specific rewrites go here, oldest first

        self.version = CURRENT_VERSION;
    }

    pub fn viewer_config(&self, file_name: Option<String>) -> ViewerConfig {
        ViewerConfig {
            zoom_mode: self.zoom_mode,
            reading_direction: self.reading_direction,
            forward_buffer: self.forward_buffer,
            key_bindings: self.key_bindings.clone(),
            smart_threshold: self.smart_threshold,
            max_chunk_height: self.max_chunk_height,
            file_name,
        }
    }

    /// Shortcut table; unknown action names are reported here, at startup
    pub fn action_table(&self) -> crate::Result<ActionTable> {
        ActionTable::from_shortcuts(&self.shortcuts)
    }
}

const SETTINGS_HEADER: &str = r#"# ============================================================================
# comicokrat settings
# ============================================================================
# zoom_mode: manual | originalSize | fitWidth | fitWindow | smart
# reading_direction: western | manga
# key_bindings use DOM key codes (37 = left arrow, 39 = right arrow,
# letters are their uppercase ASCII code)
# shortcuts map a key to a toolbar action: zoomIn, zoomOut, fitWidth,
# fitWindow, originalSize, smart, cycleZoom, toggleReadingMode,
# toggleToolbar, thumbs, toggleLayout, drawNextPage, drawPrevPage

"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::RawKey;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.zoom_mode, ZoomMode::Smart);
        assert_eq!(settings.reading_direction, ReadingDirection::Western);
        assert_eq!(settings.forward_buffer, 3);
        assert_eq!(settings.smart_threshold, 2.5);
        assert_eq!(settings.max_chunk_height, 1500);
        assert_eq!(settings.key_bindings.previous, RawKey(37));
        assert_eq!(settings.key_bindings.next, RawKey(39));
        assert_eq!(settings.key_bindings.toggle_layout, RawKey(76));
        assert_eq!(settings.key_bindings.thumbnails, RawKey(84));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let settings = Settings {
            zoom_mode: ZoomMode::FitWidth,
            reading_direction: ReadingDirection::Manga,
            forward_buffer: 5,
            ..Settings::default()
        };
        settings.save_to_path(&path).unwrap();

        let loaded = Settings::load_from_path(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "version: 1\nzoom_mode: originalSize\n").unwrap();

        let loaded = Settings::load_from_path(&path).unwrap();
        assert_eq!(loaded.zoom_mode, ZoomMode::OriginalSize);
        assert_eq!(loaded.forward_buffer, DEFAULT_FORWARD_BUFFER);
        assert_eq!(loaded.shortcuts, default_shortcuts());
    }

    #[test]
    fn older_file_is_stamped_with_current_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "version: 0\nforward_buffer: 0\n").unwrap();

        let loaded = Settings::load_from_path(&path).unwrap();
        assert_eq!(loaded.version, CURRENT_VERSION);
        assert_eq!(loaded.forward_buffer, 0);

        let rewritten = fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("version: 1"));
    }

    #[test]
    fn current_file_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let original = "version: 1\nforward_buffer: 5\n";
        fs::write(&path, original).unwrap();

        let loaded = Settings::load_from_path(&path).unwrap();
        assert_eq!(loaded.forward_buffer, 5);
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn unknown_zoom_mode_fails_to_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "zoom_mode: stretch\n").unwrap();
        assert!(Settings::load_from_path(&path).is_err());
    }

    #[test]
    fn bad_shortcut_is_reported() {
        let mut settings = Settings::default();
        settings.shortcuts.insert('x', "explode".to_string());
        assert!(settings.action_table().is_err());
    }

    #[test]
    fn viewer_config_carries_settings() {
        let settings = Settings {
            smart_threshold: 3.0,
            max_chunk_height: 1000,
            ..Settings::default()
        };
        let config = settings.viewer_config(Some("vol1".to_string()));
        assert_eq!(config.smart_threshold, 3.0);
        assert_eq!(config.max_chunk_height, 1000);
        assert_eq!(config.file_name.as_deref(), Some("vol1"));
    }
}
