//! highway_path_planning - behavior and trajectory planning for highway driving
//!
//! This crate reduces periodic localization and neighbor telemetry into a
//! lane decision, a target speed and a smooth short-horizon path for a
//! vehicle on a three lane road.

// Core modules
pub mod common;
pub mod config;
pub mod utils;

// Algorithm modules
pub mod mapping;
pub mod perception;
pub mod mission_planning;
pub mod path_planning;

// Pipeline and transport
pub mod planner;
pub mod messaging;

// Re-export common types for convenience
pub use common::{Direction, EgoState, Lane, LaneClass, NeighborVehicle, Path2D, Point2D, Telemetry, LANE_COUNT};
pub use common::{Interpolator, PlannerError, PlannerResult};
pub use config::PlannerConfig;
pub use mapping::{RoadMap, Waypoint};
pub use mission_planning::{BehaviorDecision, BehaviorPlanner, BehaviorState, FsmState};
pub use planner::{FramePlan, HighwayPlanner};
