//! Perch configuration system
//!
//! Centralized settings for the overlay, loaded from `perch.toml` in the
//! working directory. Every section is optional and falls back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Perch
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PerchConfig {
    /// Sprite atlas settings
    pub atlas: AtlasConfig,
    /// Animation playback settings
    pub animation: AnimationConfig,
    /// Overlay window behavior
    pub overlay: OverlayConfig,
}

/// Sprite atlas configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Directory of PNG sprites packed into the shared atlas at startup
    pub path: PathBuf,
}

/// Animation playback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Playback rate in frames per second
    pub frame_rate: f32,
}

/// Overlay window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Let mouse clicks fall through the overlay to windows underneath
    pub click_through: bool,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("assets/sprites") }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self { frame_rate: 24.0 }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { click_through: true }
    }
}

impl PerchConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Load configuration from the default location (perch.toml in the
    /// current directory) or return default configuration if loading fails
    pub fn load_or_default() -> Self {
        match Self::load_from_file("perch.toml") {
            Ok(config) => config,
            Err(reason) => {
                log::info!("using default configuration: {reason}");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = PerchConfig::default();
        assert_eq!(config.atlas.path, PathBuf::from("assets/sprites"));
        assert_eq!(config.animation.frame_rate, 24.0);
        assert!(config.overlay.click_through);
    }

    #[test]
    fn partial_toml_keeps_defaults_for_the_rest() {
        let config: PerchConfig = toml::from_str(
            r#"
            [animation]
            frame_rate = 12.0
            "#,
        )
        .unwrap();
        assert_eq!(config.animation.frame_rate, 12.0);
        assert_eq!(config.atlas.path, PathBuf::from("assets/sprites"));
        assert!(config.overlay.click_through);
    }

    #[test]
    fn full_toml_round_trips() {
        let config: PerchConfig = toml::from_str(
            r#"
            [atlas]
            path = "art/pets"

            [animation]
            frame_rate = 30.0

            [overlay]
            click_through = false
            "#,
        )
        .unwrap();
        assert_eq!(config.atlas.path, PathBuf::from("art/pets"));
        assert_eq!(config.animation.frame_rate, 30.0);
        assert!(!config.overlay.click_through);
    }
}
