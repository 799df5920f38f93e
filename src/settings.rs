//! Player settings
//!
//! Persisted as JSON next to the solution store. A missing or unreadable
//! file falls back to defaults.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::tuning::LaunchProfile;
use crate::world::World;

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Radians of rotation per unit of drag
    pub rotation_sensitivity: f32,
    /// Draw the play-volume outline
    pub outline_enabled: bool,
    /// View-space direction a launch travels ("down" on screen)
    pub launch_direction: Vec3,
    /// Trajectory shape
    pub profile: LaunchProfile,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rotation_sensitivity: 0.01,
            outline_enabled: false,
            launch_direction: Vec3::NEG_Y,
            profile: LaunchProfile::default(),
        }
    }
}

impl Settings {
    /// Outline visibility for a world; the tutorial always shows it
    pub fn effective_outline(&self, world: &World) -> bool {
        self.outline_enabled || world.is_tutorial()
    }

    /// Load settings from `path`, or defaults if it cannot be read
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Ignoring unreadable settings {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(Settings::load(&path), Settings::default());

        let settings = Settings {
            rotation_sensitivity: 0.02,
            outline_enabled: true,
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path), settings);

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "outline_enabled": true }"#).unwrap();
        let settings = Settings::load(&path);
        assert!(settings.outline_enabled);
        assert_eq!(settings.launch_direction, Vec3::NEG_Y);
    }
}
