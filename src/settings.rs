//! Tuning and scene configuration
//!
//! Everything the host may configure, loadable from JSON.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::table::{ContainerKind, ReorderMode, Transform};

/// Hover effect tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoverSettings {
    /// Scale multiplier while hovered
    pub scale: f32,
    /// Upward lift (host units) while hovered
    pub lift: f32,
    /// Depth added on top of the base z
    pub z_boost: i32,
    /// Hover animation duration (seconds)
    pub duration: f32,
}

impl Default for HoverSettings {
    fn default() -> Self {
        Self {
            scale: HOVER_SCALE,
            lift: HOVER_LIFT,
            z_boost: HOVER_Z_BOOST,
            duration: HOVER_DURATION,
        }
    }
}

/// Session-wide interaction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Size every piece is laid out with
    pub piece_size: Vec2,

    // === Effects ===
    pub hover: HoverSettings,
    /// Duration of programmatic moves (seconds)
    pub move_duration: f32,

    // === Depth ===
    /// Depth added while a piece is held
    pub hold_z_boost: i32,
    /// Depth added while a piece animates
    pub moving_z_boost: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            piece_size: Vec2::new(PIECE_WIDTH, PIECE_HEIGHT),
            hover: HoverSettings::default(),
            move_duration: MOVE_DURATION,
            hold_z_boost: HOLD_Z_BOOST,
            moving_z_boost: MOVING_Z_BOOST,
        }
    }
}

impl Settings {
    /// Parse settings; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings = serde_json::from_str(json)?;
        log::info!("Loaded settings from JSON");
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Hover disabled entirely (no lift, no scale, instant)
    pub fn without_hover(mut self) -> Self {
        self.hover = HoverSettings {
            scale: 1.0,
            lift: 0.0,
            z_boost: 0,
            duration: 0.0,
        };
        self
    }
}

/// Drop sensor placement relative to the container origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub position: Vec2,
    pub size: Vec2,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// One container in a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub name: String,
    #[serde(default)]
    pub origin: Vec2,
    pub kind: ContainerKind,
    #[serde(default)]
    pub capacity: Option<usize>,
    /// Only batches carrying this type tag may be dropped here
    #[serde(default)]
    pub accept_type: Option<String>,
    #[serde(default)]
    pub reorder: ReorderMode,
    #[serde(default)]
    pub sensor: Option<SensorConfig>,
}

impl ContainerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == Some(0) {
            return Err(ConfigError::ZeroCapacity {
                name: self.name.clone(),
            });
        }
        if let Some(sensor) = &self.sensor {
            if sensor.size.x <= 0.0 || sensor.size.y <= 0.0 {
                return Err(ConfigError::NonPositiveSensor {
                    name: self.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// One piece in a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceConfig {
    pub name: String,
    #[serde(default)]
    pub kind_tag: Option<String>,
    #[serde(default = "default_true")]
    pub interaction_enabled: bool,
    #[serde(default)]
    pub transform: Transform,
    /// Name of the container the piece starts in
    #[serde(default)]
    pub container: Option<String>,
}

/// Containers and pieces to set up a session with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub containers: Vec<ContainerConfig>,
    #[serde(default)]
    pub pieces: Vec<PieceConfig>,
}

impl SceneConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let scene: SceneConfig = serde_json::from_str(json)?;
        for container in &scene.containers {
            container.validate()?;
        }
        Ok(scene)
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = Settings::from_json(r#"{ "move_duration": 0.5 }"#).unwrap();
        assert_eq!(settings.move_duration, 0.5);
        assert_eq!(settings.hover, HoverSettings::default());
        assert_eq!(settings.piece_size, Vec2::new(PIECE_WIDTH, PIECE_HEIGHT));
    }

    #[test]
    fn test_settings_json_round_trip() {
        let settings = Settings::default().without_hover();
        let json = settings.to_json().unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_bad_json_is_error() {
        assert!(matches!(
            Settings::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_scene_parses_and_validates() {
        let json = r#"{
            "containers": [
                {
                    "name": "hand",
                    "kind": { "Hand": { "max_spread": 600.0, "fit_sensor": true } },
                    "capacity": 7,
                    "accept_type": "card",
                    "reorder": "SwapOnly",
                    "sensor": { "position": [-300.0, -100.0], "size": [600.0, 200.0] }
                },
                {
                    "name": "deck",
                    "origin": [0.0, -400.0],
                    "kind": { "Pile": {
                        "direction": "Up", "gap": 0.5, "max_visible": 6,
                        "restrict_to_top": true, "grab_above": false
                    } }
                }
            ],
            "pieces": [
                { "name": "ace", "kind_tag": "card", "container": "deck" }
            ]
        }"#;
        let scene = SceneConfig::from_json(json).unwrap();
        assert_eq!(scene.containers.len(), 2);
        assert_eq!(scene.containers[0].reorder, ReorderMode::SwapOnly);
        assert!(scene.containers[0].sensor.unwrap().enabled);
        assert!(scene.pieces[0].interaction_enabled);
        assert_eq!(scene.pieces[0].container.as_deref(), Some("deck"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let json = r#"{ "containers": [
            { "name": "tiny", "kind": { "Hand": { "max_spread": 1.0, "fit_sensor": false } }, "capacity": 0 }
        ] }"#;
        assert!(matches!(
            SceneConfig::from_json(json),
            Err(ConfigError::ZeroCapacity { .. })
        ));
    }
}
