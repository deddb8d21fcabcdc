//! Planner configuration
//!
//! Every tunable constant lives in a per-component struct with a `Default`
//! implementation. A JSON file only needs to name the values it overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::{PlannerError, PlannerResult};
use crate::mapping::DEFAULT_MAX_S;
use crate::mission_planning::BehaviorConfig;
use crate::path_planning::TrajectoryConfig;
use crate::perception::PerceptionConfig;

/// Road map source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadConfig {
    pub map_file: PathBuf,
    /// Track length [m]
    pub max_s: f64,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            map_file: PathBuf::from("data/highway_map.csv"),
            max_s: DEFAULT_MAX_S,
        }
    }
}

/// Websocket listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4567,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub road: RoadConfig,
    pub perception: PerceptionConfig,
    pub behavior: BehaviorConfig,
    pub trajectory: TrajectoryConfig,
    pub server: ServerConfig,
}

impl PlannerConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> PlannerResult<Self> {
        let config: PlannerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> PlannerResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&text)?;
        info!("loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> PlannerResult<()> {
        positive("road.max_s", self.road.max_s)?;

        let perception = &self.perception;
        positive("perception.lane_width", perception.lane_width)?;
        positive("perception.frame_period", perception.frame_period)?;
        non_negative("perception.front_gap_cap", perception.front_gap_cap)?;
        non_negative("perception.back_gap_cap", perception.back_gap_cap)?;

        let behavior = &self.behavior;
        positive("behavior.lane_width", behavior.lane_width)?;
        positive("behavior.speed_limit", behavior.speed_limit)?;
        positive("behavior.speed_step", behavior.speed_step)?;
        non_negative("behavior.initial_speed", behavior.initial_speed)?;

        let trajectory = &self.trajectory;
        if trajectory.horizon == 0 {
            return Err(PlannerError::ConfigError(
                "trajectory.horizon must be positive".to_string(),
            ));
        }
        if trajectory.anchor_count == 0 {
            return Err(PlannerError::ConfigError(
                "trajectory.anchor_count must be positive".to_string(),
            ));
        }
        positive("trajectory.anchor_spacing", trajectory.anchor_spacing)?;
        positive("trajectory.lookahead", trajectory.lookahead)?;
        positive("trajectory.frame_period", trajectory.frame_period)?;
        positive("trajectory.mph_to_mps", trajectory.mph_to_mps)?;
        positive("trajectory.lane_width", trajectory.lane_width)?;

        // components must agree on the road geometry and the control period
        agree(
            ("perception.lane_width", perception.lane_width),
            ("behavior.lane_width", behavior.lane_width),
        )?;
        agree(
            ("perception.lane_width", perception.lane_width),
            ("trajectory.lane_width", trajectory.lane_width),
        )?;
        agree(
            ("perception.frame_period", perception.frame_period),
            ("trajectory.frame_period", trajectory.frame_period),
        )?;

        Ok(())
    }
}

fn positive(name: &str, value: f64) -> PlannerResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(PlannerError::ConfigError(format!(
            "{} must be positive, got {}",
            name, value
        )))
    }
}

fn agree(a: (&str, f64), b: (&str, f64)) -> PlannerResult<()> {
    if (a.1 - b.1).abs() <= 1e-9 {
        Ok(())
    } else {
        Err(PlannerError::ConfigError(format!(
            "{} ({}) and {} ({}) must be equal",
            a.0, a.1, b.0, b.1
        )))
    }
}

fn non_negative(name: &str, value: f64) -> PlannerResult<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(PlannerError::ConfigError(format!(
            "{} must not be negative, got {}",
            name, value
        )))
    }
}
