//! Per-lane proximity aggregation
//!
//! Reduces the neighbor list of one telemetry frame into the nearest
//! projected front and back gap for the ego lane and both adjacent lanes,
//! together with the alarms the behavior planner reacts to. Nothing is
//! carried over between frames: every call starts from the capped gaps.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::{Lane, LaneClass, NeighborVehicle};

/// Configuration for proximity aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Front gap reported when nothing is ahead [m]
    pub front_gap_cap: f64,
    /// Back gap reported when nothing is behind [m]
    pub back_gap_cap: f64,
    /// Front gap below which the front alarm fires [m]
    pub front_alarm_gap: f64,
    /// Back gap below which the back alarm fires [m]
    pub back_alarm_gap: f64,
    /// Control cycle duration [s]
    pub frame_period: f64,
    /// Lane width [m]
    pub lane_width: f64,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            front_gap_cap: 50.0,
            back_gap_cap: 30.0,
            front_alarm_gap: 30.0,
            back_alarm_gap: 10.0,
            frame_period: 0.02,
            lane_width: 4.0,
        }
    }
}

/// Nearest gaps and alarms for one lane class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximitySummary {
    pub front_gap: f64,
    pub back_gap: f64,
    pub front_alarm: bool,
    pub back_alarm: bool,
}

impl ProximitySummary {
    fn capped(config: &PerceptionConfig) -> Self {
        Self {
            front_gap: config.front_gap_cap,
            back_gap: config.back_gap_cap,
            front_alarm: false,
            back_alarm: false,
        }
    }
}

/// Proximity of the three lane classes for a single frame
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityReport {
    in_lane: ProximitySummary,
    left: ProximitySummary,
    right: ProximitySummary,
}

impl ProximityReport {
    /// Report with every gap at its cap and no alarm raised
    pub fn new(config: &PerceptionConfig) -> Self {
        let capped = ProximitySummary::capped(config);
        Self {
            in_lane: capped,
            left: capped,
            right: capped,
        }
    }

    pub fn summary(&self, class: LaneClass) -> &ProximitySummary {
        match class {
            LaneClass::InLane => &self.in_lane,
            LaneClass::Left => &self.left,
            LaneClass::Right => &self.right,
        }
    }

    pub fn summary_mut(&mut self, class: LaneClass) -> &mut ProximitySummary {
        match class {
            LaneClass::InLane => &mut self.in_lane,
            LaneClass::Left => &mut self.left,
            LaneClass::Right => &mut self.right,
        }
    }

    /// Combined alarm: the ego lane only looks ahead, adjacent lanes look both ways
    pub fn too_close(&self, class: LaneClass) -> bool {
        let summary = self.summary(class);
        match class {
            LaneClass::InLane => summary.front_alarm,
            LaneClass::Left | LaneClass::Right => summary.front_alarm || summary.back_alarm,
        }
    }

    pub fn front_gap(&self, class: LaneClass) -> f64 {
        self.summary(class).front_gap
    }

    pub fn back_gap(&self, class: LaneClass) -> f64 {
        self.summary(class).back_gap
    }

    pub fn back_alarm(&self, class: LaneClass) -> bool {
        self.summary(class).back_alarm
    }
}

/// Builds a `ProximityReport` from one frame of neighbor telemetry
#[derive(Debug, Clone)]
pub struct LaneProximityAggregator {
    config: PerceptionConfig,
}

impl LaneProximityAggregator {
    pub fn new(config: PerceptionConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(PerceptionConfig::default())
    }

    pub fn config(&self) -> &PerceptionConfig {
        &self.config
    }

    /// Lane class of a vehicle at lateral offset `d`, `None` if it is in no lane we watch
    pub fn classify(&self, ego_lane: Lane, d: f64) -> Option<LaneClass> {
        LaneClass::ALL.iter().copied().find(|class| {
            class
                .lane(ego_lane)
                .map_or(false, |lane| lane.contains_d(d, self.config.lane_width))
        })
    }

    /// Constant-velocity estimate of the neighbor's `s` when the previous path runs out
    pub fn projected_s(&self, neighbor: &NeighborVehicle, unconsumed: usize) -> f64 {
        neighbor.s + unconsumed as f64 * self.config.frame_period * neighbor.speed()
    }

    /// Aggregate all neighbors relative to an ego vehicle at `ego_s` in `ego_lane`
    pub fn aggregate(
        &self,
        ego_s: f64,
        ego_lane: Lane,
        neighbors: &[NeighborVehicle],
        unconsumed: usize,
    ) -> ProximityReport {
        let mut report = ProximityReport::new(&self.config);

        for neighbor in neighbors {
            let class = match self.classify(ego_lane, neighbor.d) {
                Some(class) => class,
                None => continue,
            };
            let future_s = self.projected_s(neighbor, unconsumed);
            let summary = report.summary_mut(class);

            if future_s > ego_s {
                let gap = future_s - ego_s;
                summary.front_gap = summary.front_gap.min(gap);
                summary.front_alarm |= gap < self.config.front_alarm_gap;
            }

            if class != LaneClass::InLane && future_s <= ego_s {
                let gap = ego_s - future_s;
                summary.back_gap = summary.back_gap.min(gap);
                // an exact longitudinal tie counts as a hazard
                summary.back_alarm |= gap < self.config.back_alarm_gap || future_s == ego_s;
            }
        }

        debug!(
            "gaps front/back: in-lane {:.1}/{:.1} left {:.1}/{:.1} right {:.1}/{:.1}",
            report.in_lane.front_gap,
            report.in_lane.back_gap,
            report.left.front_gap,
            report.left.back_gap,
            report.right.front_gap,
            report.right.back_gap
        );

        report
    }
}
