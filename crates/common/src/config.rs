//! Simulation configuration.
//!
//! Every section defaults independently, so a config file only needs the
//! values it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {field} must be {requirement}")]
    Invalid {
        field: &'static str,
        requirement: &'static str,
    },
}

/// Movement and collision tuning. Speeds are per second, distances in world units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub terminal_velocity: f32,
    pub jump_velocity: f32,
    pub walk_speed: f32,
    /// Radians per second for the turn axes.
    pub turn_speed: f32,
    /// Frame delta ceiling in seconds.
    pub max_dt: f32,
    pub max_fall_per_frame: f32,
    pub landing_tolerance: f32,
    pub avatar_radius: f32,
    pub avatar_height: f32,
    /// Fraction of the remaining yaw error closed each frame when auto-facing.
    pub auto_face_fraction: f32,
    /// Per-60Hz-frame velocity retention on slippery surfaces.
    pub slippery_decay: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 30.0,
            terminal_velocity: 50.0,
            jump_velocity: 12.0,
            walk_speed: 6.0,
            turn_speed: 3.0,
            max_dt: 0.1,
            max_fall_per_frame: 2.0,
            landing_tolerance: 0.25,
            avatar_radius: 0.5,
            avatar_height: 1.8,
            auto_face_fraction: 0.2,
            slippery_decay: 0.95,
        }
    }
}

/// Proximity scanning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Scan once every N frames.
    pub scan_interval_frames: u32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            scan_interval_frames: 10,
        }
    }
}

/// Seat dismount tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeatConfig {
    pub dismount_distance: f32,
}

impl Default for SeatConfig {
    fn default() -> Self {
        Self {
            dismount_distance: 1.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Seconds to wait for a gated-room entitlement decision.
    pub entitlement_timeout: f64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            entitlement_timeout: 10.0,
        }
    }
}

/// Remote avatar smoothing and animation level of detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub horizontal_rate: f32,
    pub vertical_rate: f32,
    pub rotation_rate: f32,
    /// Snapshots further than this from the rendered position snap instead of smoothing.
    pub snap_distance: f32,
    /// Lifetime of non-continuous remote emotes, in seconds.
    pub emote_duration: f64,
    /// Beyond this distance from the local avatar, animation updates are throttled.
    pub animation_lod_distance: f32,
    pub animation_lod_interval: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            horizontal_rate: 10.0,
            vertical_rate: 15.0,
            rotation_rate: 12.0,
            snap_distance: 25.0,
            emote_duration: 3.0,
            animation_lod_distance: 40.0,
            animation_lod_interval: 4,
        }
    }
}

/// Outbound publish rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub publish_rate_hz: f32,
    pub min_position_delta: f32,
    pub min_yaw_delta: f32,
    /// Seconds between ball republishes while this client owns the last kick.
    pub ball_republish_interval: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            publish_rate_hz: 10.0,
            min_position_delta: 0.05,
            min_yaw_delta: 0.05,
            ball_republish_interval: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Seconds between resume-record offers.
    pub interval: f64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { interval: 5.0 }
    }
}

/// Host device capabilities, passed in explicitly at initialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    pub mobile: bool,
}

/// Every tunable of the simulation, loaded once at startup.
///
/// Missing sections and fields fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub physics: PhysicsConfig,
    pub interaction: InteractionConfig,
    pub seat: SeatConfig,
    pub transition: TransitionConfig,
    pub reconcile: ReconcileConfig,
    pub network: NetworkConfig,
    pub persistence: PersistenceConfig,
    pub device: DeviceProfile,
}

impl SimConfig {
    /// Load from a `.yaml`/`.yml` or `.json` file, then validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let config: SimConfig = if is_json {
            serde_json::from_str(&text)?
        } else {
            serde_yaml::from_str(&text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject values that would stall or destabilize the frame, such as a zero
    /// scan interval or a non-positive `max_dt`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.physics;
        check(p.gravity > 0.0, "physics.gravity", "positive")?;
        check(p.terminal_velocity > 0.0, "physics.terminal_velocity", "positive")?;
        check(p.max_dt > 0.0, "physics.max_dt", "positive")?;
        check(p.max_fall_per_frame > 0.0, "physics.max_fall_per_frame", "positive")?;
        check(p.avatar_radius >= 0.0, "physics.avatar_radius", "non-negative")?;
        check(
            p.auto_face_fraction > 0.0 && p.auto_face_fraction <= 1.0,
            "physics.auto_face_fraction",
            "in (0, 1]",
        )?;
        check(
            (0.0..1.0).contains(&p.slippery_decay),
            "physics.slippery_decay",
            "in [0, 1)",
        )?;
        check(
            self.interaction.scan_interval_frames > 0,
            "interaction.scan_interval_frames",
            "at least 1",
        )?;
        check(
            self.transition.entitlement_timeout > 0.0,
            "transition.entitlement_timeout",
            "positive",
        )?;
        check(
            self.reconcile.animation_lod_interval > 0,
            "reconcile.animation_lod_interval",
            "at least 1",
        )?;
        check(
            self.network.publish_rate_hz > 0.0,
            "network.publish_rate_hz",
            "positive",
        )?;
        check(
            self.persistence.interval > 0.0,
            "persistence.interval",
            "positive",
        )?;
        Ok(())
    }

    /// Animation LOD distance adjusted for the device profile.
    pub fn animation_lod_distance(&self) -> f32 {
        if self.device.mobile {
            self.reconcile.animation_lod_distance * 0.5
        } else {
            self.reconcile.animation_lod_distance
        }
    }
}

fn check(ok: bool, field: &'static str, requirement: &'static str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field, requirement })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let cfg = SimConfig::from_yaml_str("physics:\n  gravity: 9.8\n").unwrap();
        assert_eq!(cfg.physics.gravity, 9.8);
        assert_eq!(cfg.physics.jump_velocity, 12.0);
        assert_eq!(cfg.interaction.scan_interval_frames, 10);
    }

    #[test]
    fn invalid_value_rejected() {
        let err = SimConfig::from_yaml_str("interaction:\n  scan_interval_frames: 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "interaction.scan_interval_frames",
                ..
            }
        ));
    }

    #[test]
    fn load_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.json");
        std::fs::write(&path, r#"{"seat": {"dismount_distance": 2.0}}"#).unwrap();
        let cfg = SimConfig::load(&path).unwrap();
        assert_eq!(cfg.seat.dismount_distance, 2.0);
    }

    #[test]
    fn yaml_roundtrip_of_defaults() {
        let text = SimConfig::default().to_yaml().unwrap();
        let back = SimConfig::from_yaml_str(&text).unwrap();
        assert_eq!(back, SimConfig::default());
    }

    #[test]
    fn mobile_profile_shortens_lod_distance() {
        let mut cfg = SimConfig::default();
        let desktop = cfg.animation_lod_distance();
        cfg.device.mobile = true;
        assert!(cfg.animation_lod_distance() < desktop);
    }
}
