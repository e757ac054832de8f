use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::detection::domain::detection_config::DetectionConfig;
use crate::shared::constants::{CAPTURE_HEIGHT, CAPTURE_WIDTH};

const APP_DIR: &str = "facecap";
const SETTINGS_FILE: &str = "settings.json";

/// Explicitly constructed session configuration, persisted as JSON in the
/// platform config directory.
///
/// Missing or unreadable settings fall back to [`Default`]; unknown fields
/// are ignored and absent fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub detection: DetectionConfig,
    /// Where saved images (and by default `images.zip`) are written.
    pub output_dir: PathBuf,
    pub camera_index: i32,
    pub capture_width: u32,
    pub capture_height: u32,
    /// Overrides cascade resolution when set.
    pub cascade_path: Option<PathBuf>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            output_dir: PathBuf::from("."),
            camera_index: 0,
            capture_width: CAPTURE_WIDTH,
            capture_height: CAPTURE_HEIGHT,
            cascade_path: None,
        }
    }
}

impl SessionSettings {
    /// `<config_dir>/facecap/settings.json`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Loads the persisted settings, or the defaults when there are none.
    pub fn init() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<Self>(&json) {
            Ok(mut settings) => {
                settings.detection = settings.detection.clamped();
                settings
            }
            Err(e) => {
                log::warn!("Ignoring unreadable settings {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            return;
        };
        if let Err(e) = self.save_to(&path) {
            log::warn!("Failed to save settings to {}: {e}", path.display());
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::box_color::BoxColor;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let s = SessionSettings::default();
        assert_eq!((s.capture_width, s.capture_height), (1280, 720));
        assert_eq!(s.camera_index, 0);
        assert_eq!(s.detection, DetectionConfig::default());
        assert!(s.cascade_path.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facecap").join("settings.json");
        let mut settings = SessionSettings {
            camera_index: 2,
            output_dir: dir.path().join("shots"),
            ..SessionSettings::default()
        };
        settings.detection.set_scale_factor(1.8).unwrap();
        settings.detection.set_box_color(BoxColor::new(0xAB, 0x01, 0x7F));

        settings.save_to(&path).unwrap();
        let loaded = SessionSettings::load_from(&path);

        assert_eq!(loaded, settings);
        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"#AB017F\""));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = SessionSettings::load_from(&dir.path().join("nope.json"));
        assert_eq!(loaded, SessionSettings::default());
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(SessionSettings::load_from(&path), SessionSettings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults_and_clamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"camera_index": 1, "detection": {"scale_factor": 9.0, "min_neighbors": 0}}"#,
        )
        .unwrap();

        let loaded = SessionSettings::load_from(&path);

        assert_eq!(loaded.camera_index, 1);
        assert_eq!(loaded.capture_width, 1280);
        assert_relative_eq!(loaded.detection.scale_factor(), 2.0);
        assert_eq!(loaded.detection.min_neighbors(), 1);
        assert_eq!(loaded.detection.box_color(), BoxColor::GREEN);
    }

    #[test]
    fn test_config_path_is_under_app_dir() {
        if let Some(path) = SessionSettings::config_path() {
            assert!(path.ends_with("facecap/settings.json"));
        }
    }
}
