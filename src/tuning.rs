//! Data-driven game balance
//!
//! Every gameplay constant lives in [`RunnerConfig`]. Defaults match the
//! shipped game; hosts may override them from JSON.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a [`RunnerConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse runner config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid runner config: {0}")]
    Invalid(String),
}

/// Dimensions of one obstacle profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleProfile {
    /// Extent along z (world units)
    pub depth: f32,
    /// Extent along y (world units)
    pub height: f32,
}

/// Tunable constants for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Forward displacement of the world per tick (world units/tick)
    pub game_speed: f32,

    // === Track ===
    /// Length of one ground tile
    pub tile_length: f32,
    /// Number of tiles in the ground ring
    pub tile_count: usize,
    /// Lateral width of a ground tile
    pub track_width: f32,
    /// Obstacle lane centers (left, center, right)
    pub lane_centers: [f32; 3],

    // === Obstacles ===
    pub obstacles_per_wave: usize,
    pub gap_between_obstacles: f32,
    pub gap_between_waves: f32,
    /// z at which the first wave starts
    pub first_wave_z: f32,
    /// Waves spawned when a run initializes
    pub initial_waves: usize,
    /// Obstacles past this z are recycled
    pub remove_distance: f32,
    pub obstacle_width: f32,
    pub short_obstacle: ObstacleProfile,
    pub long_obstacle: ObstacleProfile,
    /// Probability of blocking a single lane when two or more are free
    pub single_block_chance: f64,
    /// Optional ceiling on live obstacles. `None` keeps the purely reactive trigger.
    pub max_live_obstacles: Option<usize>,

    // === Player ===
    /// Player lane centers (left, center, right), centered between lane lines
    pub player_lane_centers: [f32; 3],
    /// Fraction of the remaining lateral distance covered per tick
    pub transition_speed: f32,
    /// Snap distance that ends a lane transition
    pub transition_epsilon: f32,
    /// Allowed z drift before the player is pulled back to z = 0
    pub z_drift_tolerance: f32,
    pub player_radius: f32,
    pub player_height: f32,
    /// Resting height of the player body center
    pub player_spawn_y: f32,
    pub player_additional_mass: f32,
    /// Linear impulse applied on the first collision
    pub knockback_impulse: [f32; 3],
    /// Angular impulse applied on the first collision
    pub knockback_torque: [f32; 3],

    // === World ===
    pub gravity: [f32; 3],
    /// Ticks between the collision and the game-over menu
    pub game_over_menu_delay_ticks: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            game_speed: 0.3,

            tile_length: 40.0,
            tile_count: 5,
            track_width: 9.0,
            lane_centers: [-3.0, 0.0, 3.0],

            obstacles_per_wave: 6,
            gap_between_obstacles: 6.0,
            gap_between_waves: 2.0,
            first_wave_z: -20.0,
            initial_waves: 10,
            remove_distance: 10.0,
            obstacle_width: 2.4,
            short_obstacle: ObstacleProfile {
                depth: 2.0,
                height: 1.8,
            },
            long_obstacle: ObstacleProfile {
                depth: 8.0,
                height: 2.0,
            },
            single_block_chance: 0.6,
            max_live_obstacles: None,

            player_lane_centers: [-2.25, 0.0, 2.25],
            transition_speed: 0.3,
            transition_epsilon: 0.05,
            z_drift_tolerance: 0.1,
            player_radius: 0.25,
            player_height: 0.8,
            player_spawn_y: 0.75,
            player_additional_mass: 1.0,
            knockback_impulse: [0.0, 5.0, 3.0],
            knockback_torque: [2.0, 0.0, 0.0],

            gravity: [0.0, -9.81, 0.0],
            game_over_menu_delay_ticks: 120,
        }
    }
}

impl RunnerConfig {
    /// Parse and validate a config from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.game_speed > 0.0) {
            return Err(ConfigError::Invalid("game_speed must be positive".into()));
        }
        if self.tile_count == 0 || !(self.tile_length > 0.0) {
            return Err(ConfigError::Invalid(
                "track needs at least one tile of positive length".into(),
            ));
        }
        if self.obstacles_per_wave == 0 {
            return Err(ConfigError::Invalid(
                "obstacles_per_wave must be at least 1".into(),
            ));
        }
        if self.gap_between_obstacles < 0.0 || self.gap_between_waves < 0.0 {
            return Err(ConfigError::Invalid("gaps must not be negative".into()));
        }
        for profile in [self.short_obstacle, self.long_obstacle] {
            if !(profile.depth > 0.0) || !(profile.height > 0.0) {
                return Err(ConfigError::Invalid(
                    "obstacle depth and height must be positive".into(),
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.single_block_chance) {
            return Err(ConfigError::Invalid(
                "single_block_chance must be within [0, 1]".into(),
            ));
        }
        if !(self.transition_speed > 0.0 && self.transition_speed <= 1.0) {
            return Err(ConfigError::Invalid(
                "transition_speed must be within (0, 1]".into(),
            ));
        }
        // Easing only reaches the target through the snap
        if !(self.transition_epsilon > 0.0) || !(self.z_drift_tolerance > 0.0) {
            return Err(ConfigError::Invalid(
                "transition_epsilon and z_drift_tolerance must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Span covered by the whole ground ring
    pub fn ring_length(&self) -> f32 {
        self.tile_length * self.tile_count as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(RunnerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config = RunnerConfig::from_json(r#"{ "game_speed": 0.5, "obstacles_per_wave": 4 }"#)
            .expect("partial config should parse");
        assert_eq!(config.game_speed, 0.5);
        assert_eq!(config.obstacles_per_wave, 4);
        assert_eq!(config.tile_count, 5);
        assert_eq!(config.long_obstacle.depth, 8.0);
    }

    #[test]
    fn test_json_round_trip_keeps_cap() {
        let config = RunnerConfig {
            max_live_obstacles: Some(200),
            ..Default::default()
        };
        let json = config.to_json().unwrap();
        let back = RunnerConfig::from_json(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = RunnerConfig::from_json(r#"{ "obstacles_per_wave": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = RunnerConfig::from_json(r#"{ "single_block_chance": 1.5 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        for json in [
            r#"{ "transition_epsilon": 0.0 }"#,
            r#"{ "transition_epsilon": -0.05 }"#,
            r#"{ "z_drift_tolerance": 0.0 }"#,
            r#"{ "z_drift_tolerance": -1.0 }"#,
        ] {
            let err = RunnerConfig::from_json(json).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{json} accepted");
        }

        let err = RunnerConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
