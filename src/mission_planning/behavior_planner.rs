//! Behavior planner
//!
//! Decides, once per telemetry frame, the target lane and target speed of the
//! ego vehicle from the lane proximity report. All state that persists across
//! frames lives in `BehaviorPlanner`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::lane_cost::lane_change_cost;
use super::state_machine::{FsmState, StateMachine, Transition};
use crate::common::{Direction, Lane, LaneClass};
use crate::perception::ProximityReport;

/// Configuration for the behavior planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Speed ceiling [mph]
    pub speed_limit: f64,
    /// Speed change per frame [mph]
    pub speed_step: f64,
    /// In-lane frames to wait after a lane change before another may start
    pub stabilization_frames: u32,
    /// A side must cost less than this to be chosen
    pub lane_change_max_cost: f64,
    /// Upper bound used when breaking a tie towards the right
    pub tie_break_max_cost: f64,
    /// Cost of leaving the road
    pub edge_lane_cost: f64,
    /// Front gap at which a side costs nothing [m]
    pub max_front_cost: f64,
    /// Lane width [m]
    pub lane_width: f64,
    pub initial_lane: usize,
    /// [mph]
    pub initial_speed: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            speed_limit: 49.0,
            speed_step: 0.224,
            stabilization_frames: 15,
            lane_change_max_cost: 15.0,
            tie_break_max_cost: 30.0,
            edge_lane_cost: 100.0,
            max_front_cost: 50.0,
            lane_width: 4.0,
            initial_lane: 1,
            initial_speed: 0.0,
        }
    }
}

/// Snapshot of the planning context carried between frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviorState {
    pub fsm_state: FsmState,
    pub current_lane: Lane,
    /// [mph]
    pub target_speed: f64,
    pub lane_change_in_progress: bool,
    pub stabilization_counter: u32,
}

/// Output of one planning step
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorDecision {
    pub lane: Lane,
    /// [mph]
    pub target_speed: f64,
    pub fsm_state: FsmState,
    pub lane_change_in_progress: bool,
    /// State changes made during this step, in order
    pub transitions: Vec<Transition>,
}

/// Lane keeping / lane change decision maker
#[derive(Debug, Clone)]
pub struct BehaviorPlanner {
    config: BehaviorConfig,
    machine: StateMachine,
    lane: Lane,
    target_speed: f64,
    lane_change_in_progress: bool,
    stabilization_counter: u32,
}

impl BehaviorPlanner {
    pub fn new(config: BehaviorConfig) -> Self {
        let lane = Lane::new(config.initial_lane).unwrap_or_else(|| {
            warn!(
                "initial lane {} is off the road, starting in lane {}",
                config.initial_lane,
                Lane::default().index()
            );
            Lane::default()
        });
        let state = BehaviorState {
            fsm_state: FsmState::KeepLane,
            current_lane: lane,
            target_speed: config.initial_speed,
            lane_change_in_progress: false,
            stabilization_counter: config.stabilization_frames,
        };
        Self::from_state(config, state)
    }

    pub fn with_defaults() -> Self {
        Self::new(BehaviorConfig::default())
    }

    /// Resume planning from a known context
    pub fn from_state(config: BehaviorConfig, state: BehaviorState) -> Self {
        Self {
            config,
            machine: StateMachine::new("BehaviorPlanner", state.fsm_state),
            lane: state.current_lane,
            target_speed: state.target_speed,
            lane_change_in_progress: state.lane_change_in_progress,
            stabilization_counter: state.stabilization_counter,
        }
    }

    pub fn config(&self) -> &BehaviorConfig {
        &self.config
    }

    pub fn state(&self) -> BehaviorState {
        BehaviorState {
            fsm_state: self.machine.current_state(),
            current_lane: self.lane,
            target_speed: self.target_speed,
            lane_change_in_progress: self.lane_change_in_progress,
            stabilization_counter: self.stabilization_counter,
        }
    }

    /// Run one frame of the behavior logic.
    ///
    /// `ego_d` is the measured lateral position of the vehicle, used to tell
    /// when a lane change has reached the target lane.
    pub fn step(&mut self, report: &ProximityReport, ego_d: f64) -> BehaviorDecision {
        let mut transitions = Vec::new();

        if self.lane_change_in_progress && self.lane.contains_d(ego_d, self.config.lane_width) {
            if self.stabilization_counter == 0 {
                self.lane_change_in_progress = false;
                info!("settled in lane {}", self.lane.index());
                transitions.extend(self.machine.transition_to(FsmState::KeepLane));
            } else {
                self.stabilization_counter -= 1;
                debug!(
                    "lane change stabilization, {} frames left",
                    self.stabilization_counter
                );
            }
        }

        if report.too_close(LaneClass::InLane) {
            self.target_speed = (self.target_speed - self.config.speed_step).max(0.0);
            if !self.lane_change_in_progress {
                transitions.extend(self.machine.transition_to(FsmState::PrepareLaneChange));
                transitions.extend(self.try_lane_shift(report));
            }
        } else if self.target_speed < self.config.speed_limit {
            self.target_speed += self.config.speed_step;
        } else {
            transitions.extend(self.machine.transition_to(FsmState::KeepLane));
            self.stabilization_counter = 0;
        }

        BehaviorDecision {
            lane: self.lane,
            target_speed: self.target_speed,
            fsm_state: self.machine.current_state(),
            lane_change_in_progress: self.lane_change_in_progress,
            transitions,
        }
    }

    /// Pick a side to move to, if one is cheap and safe enough
    fn choose_direction(&self, report: &ProximityReport) -> Option<Direction> {
        let left_cost = lane_change_cost(self.lane, Direction::Left, report, &self.config);
        let right_cost = lane_change_cost(self.lane, Direction::Right, report, &self.config);
        let left_unsafe = report.too_close(LaneClass::Left);
        let right_unsafe = report.too_close(LaneClass::Right);

        debug!(
            "lane change cost: left {:.1} right {:.1}",
            left_cost, right_cost
        );

        if left_cost < right_cost && left_cost < self.config.lane_change_max_cost && !left_unsafe {
            Some(Direction::Left)
        } else if right_cost < left_cost
            && right_cost < self.config.lane_change_max_cost
            && !right_unsafe
        {
            Some(Direction::Right)
        } else if left_cost == 0.0
            && right_cost == 0.0
            && right_cost < self.config.tie_break_max_cost
            && !right_unsafe
        {
            // both sides free: keep the leftmost lane for faster traffic
            Some(Direction::Right)
        } else {
            None
        }
    }

    fn try_lane_shift(&mut self, report: &ProximityReport) -> Option<Transition> {
        let direction = match self.choose_direction(report) {
            Some(direction) => direction,
            None => {
                for direction in [Direction::Left, Direction::Right] {
                    let cost = lane_change_cost(self.lane, direction, report, &self.config);
                    if cost < self.config.lane_change_max_cost && report.too_close(direction.into()) {
                        warn!(
                            "lane change {:?} rejected, back gap {:.1}",
                            direction,
                            report.back_gap(direction.into())
                        );
                    }
                }
                return None;
            }
        };
        let target = self.lane.adjacent(direction)?;

        info!(
            "changing lane {:?}: {} -> {}",
            direction,
            self.lane.index(),
            target.index()
        );
        self.lane = target;
        self.lane_change_in_progress = true;
        self.stabilization_counter = self.config.stabilization_frames;
        self.machine.transition_to(FsmState::lane_change(direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::NeighborVehicle;
    use crate::perception::LaneProximityAggregator;

    const EGO_S: f64 = 100.0;

    fn report(ego_lane: Lane, neighbors: &[NeighborVehicle]) -> ProximityReport {
        LaneProximityAggregator::with_defaults().aggregate(EGO_S, ego_lane, neighbors, 0)
    }

    fn parked(id: i64, gap: f64, d: f64) -> NeighborVehicle {
        NeighborVehicle::new(id, 0.0, 0.0, 0.0, 0.0, EGO_S + gap, d)
    }

    fn planner_at(lane: Lane, speed: f64) -> BehaviorPlanner {
        BehaviorPlanner::from_state(
            BehaviorConfig::default(),
            BehaviorState {
                fsm_state: FsmState::KeepLane,
                current_lane: lane,
                target_speed: speed,
                lane_change_in_progress: false,
                stabilization_counter: 15,
            },
        )
    }

    #[test]
    fn test_free_road_accelerates_to_limit() {
        let mut planner = BehaviorPlanner::with_defaults();
        let clear = report(Lane::CENTER, &[]);
        let mut previous = 0.0;
        for _ in 0..400 {
            let decision = planner.step(&clear, 6.0);
            assert!(decision.target_speed >= previous);
            assert!(decision.target_speed < 49.0 + 0.224 + 1e-9);
            previous = decision.target_speed;
        }
        let state = planner.state();
        assert!(state.target_speed >= 49.0);
        assert_eq!(state.fsm_state, FsmState::KeepLane);
        assert_eq!(state.current_lane, Lane::CENTER);
        assert_eq!(state.stabilization_counter, 0);
    }

    #[test]
    fn test_first_step_speed_increment() {
        let mut planner = BehaviorPlanner::with_defaults();
        let decision = planner.step(&report(Lane::CENTER, &[]), 6.0);
        assert!((decision.target_speed - 0.224).abs() < 1e-12);
        assert!(decision.transitions.is_empty());
    }

    #[test]
    fn test_blocked_ahead_both_sides_clear_goes_right() {
        let mut planner = planner_at(Lane::CENTER, 40.0);
        let decision = planner.step(&report(Lane::CENTER, &[parked(0, 20.0, 6.0)]), 6.0);

        assert_eq!(
            decision.transitions,
            vec![
                Transition::new(FsmState::KeepLane, FsmState::PrepareLaneChange),
                Transition::new(FsmState::PrepareLaneChange, FsmState::LaneChangeRight),
            ]
        );
        assert_eq!(decision.lane, Lane::RIGHTMOST);
        assert!(decision.lane_change_in_progress);
        assert!((decision.target_speed - (40.0 - 0.224)).abs() < 1e-12);
    }

    #[test]
    fn test_blocked_ahead_right_occupied_behind_never_goes_right() {
        let mut planner = planner_at(Lane::CENTER, 40.0);
        let neighbors = [parked(0, 20.0, 6.0), parked(1, -5.0, 10.0)];
        for _ in 0..5 {
            let decision = planner.step(&report(Lane::CENTER, &neighbors), 6.0);
            assert_ne!(decision.lane, Lane::RIGHTMOST);
            assert_ne!(decision.fsm_state, FsmState::LaneChangeRight);
        }
        assert_eq!(planner.state().current_lane, Lane::CENTER);
        assert_eq!(planner.state().fsm_state, FsmState::PrepareLaneChange);
    }

    #[test]
    fn test_blocked_ahead_right_occupied_prefers_left() {
        let mut planner = planner_at(Lane::CENTER, 40.0);
        // right lane: car behind within alarm range and one far ahead
        let neighbors = [parked(0, 20.0, 6.0), parked(1, -5.0, 10.0), parked(2, 45.0, 10.0)];
        let decision = planner.step(&report(Lane::CENTER, &neighbors), 6.0);
        assert_eq!(decision.lane, Lane::LEFTMOST);
        assert_eq!(decision.fsm_state, FsmState::LaneChangeLeft);
    }

    #[test]
    fn test_left_back_alarm_blocks_cheaper_left() {
        let mut planner = planner_at(Lane::CENTER, 40.0);
        let neighbors = [parked(0, 20.0, 6.0), parked(1, -3.0, 2.0), parked(2, 45.0, 10.0)];
        let decision = planner.step(&report(Lane::CENTER, &neighbors), 6.0);
        assert_eq!(decision.lane, Lane::CENTER);
        assert_eq!(decision.fsm_state, FsmState::PrepareLaneChange);
        assert!(!decision.lane_change_in_progress);
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        for speed in [10.0, 25.0, 48.0] {
            let mut planner = planner_at(Lane::CENTER, speed);
            // cars behind on both sides but outside the alarm range
            let neighbors = [parked(0, 10.0, 6.0), parked(1, -20.0, 2.0), parked(2, -25.0, 10.0)];
            let decision = planner.step(&report(Lane::CENTER, &neighbors), 6.0);
            assert_eq!(decision.fsm_state, FsmState::LaneChangeRight);
            assert_eq!(decision.lane, Lane::RIGHTMOST);
        }
    }

    #[test]
    fn test_edge_lanes_move_inward() {
        let mut left_edge = planner_at(Lane::LEFTMOST, 30.0);
        let decision = left_edge.step(&report(Lane::LEFTMOST, &[parked(0, 15.0, 2.0)]), 2.0);
        assert_eq!(decision.lane, Lane::CENTER);
        assert_eq!(decision.fsm_state, FsmState::LaneChangeRight);

        let mut right_edge = planner_at(Lane::RIGHTMOST, 30.0);
        let decision = right_edge.step(&report(Lane::RIGHTMOST, &[parked(0, 15.0, 10.0)]), 10.0);
        assert_eq!(decision.lane, Lane::CENTER);
        assert_eq!(decision.fsm_state, FsmState::LaneChangeLeft);
    }

    #[test]
    fn test_no_chained_lane_change() {
        let mut planner = planner_at(Lane::CENTER, 40.0);
        let blocked = report(Lane::CENTER, &[parked(0, 20.0, 6.0)]);
        planner.step(&blocked, 6.0);
        assert_eq!(planner.state().current_lane, Lane::RIGHTMOST);

        // still blocked in the new lane while the car is moving over
        let blocked_again = report(Lane::RIGHTMOST, &[parked(0, 20.0, 10.0)]);
        let decision = planner.step(&blocked_again, 7.0);
        assert!(decision.transitions.is_empty());
        assert_eq!(decision.lane, Lane::RIGHTMOST);
        assert_eq!(decision.fsm_state, FsmState::LaneChangeRight);
    }

    #[test]
    fn test_stabilization_countdown_is_exact() {
        let mut planner = planner_at(Lane::CENTER, 20.0);
        planner.step(&report(Lane::CENTER, &[parked(0, 20.0, 6.0)]), 6.0);
        assert!(planner.state().lane_change_in_progress);

        let clear = report(Lane::RIGHTMOST, &[]);
        // not yet in the target lane: the countdown does not run
        for _ in 0..5 {
            planner.step(&clear, 7.0);
        }
        assert_eq!(planner.state().stabilization_counter, 15);

        for frame in 1..=15 {
            let decision = planner.step(&clear, 10.0);
            assert!(decision.lane_change_in_progress, "cleared early at frame {}", frame);
        }
        let decision = planner.step(&clear, 10.0);
        assert!(!decision.lane_change_in_progress);
        assert_eq!(
            decision.transitions,
            vec![Transition::new(FsmState::LaneChangeRight, FsmState::KeepLane)]
        );
    }

    #[test]
    fn test_speed_never_negative() {
        let mut planner = planner_at(Lane::CENTER, 0.1);
        let blocked = report(Lane::CENTER, &[parked(0, 5.0, 6.0), parked(1, 5.0, 2.0), parked(2, 5.0, 10.0)]);
        let decision = planner.step(&blocked, 6.0);
        assert_eq!(decision.target_speed, 0.0);
    }

    #[test]
    fn test_ceiling_forces_keep_lane() {
        let mut planner = BehaviorPlanner::from_state(
            BehaviorConfig::default(),
            BehaviorState {
                fsm_state: FsmState::PrepareLaneChange,
                current_lane: Lane::CENTER,
                target_speed: 49.1,
                lane_change_in_progress: false,
                stabilization_counter: 7,
            },
        );
        let decision = planner.step(&report(Lane::CENTER, &[]), 6.0);
        assert_eq!(decision.fsm_state, FsmState::KeepLane);
        assert!((decision.target_speed - 49.1).abs() < 1e-12);
        assert_eq!(planner.state().stabilization_counter, 0);
    }

    #[test]
    fn test_invalid_initial_lane_falls_back_to_center() {
        let config = BehaviorConfig {
            initial_lane: 7,
            ..BehaviorConfig::default()
        };
        assert_eq!(BehaviorPlanner::new(config).state().current_lane, Lane::CENTER);
    }
}
