// Perception module

pub mod lane_proximity;

pub use lane_proximity::{LaneProximityAggregator, PerceptionConfig, ProximityReport, ProximitySummary};
