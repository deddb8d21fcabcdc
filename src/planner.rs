//! Frame pipeline
//!
//! `HighwayPlanner` owns the road map and every stateful component and runs
//! perception, behavior and trajectory generation for one telemetry frame.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::common::{Path2D, PlannerError, PlannerResult, Telemetry};
use crate::config::PlannerConfig;
use crate::mapping::RoadMap;
use crate::mission_planning::{BehaviorDecision, BehaviorPlanner, BehaviorState};
use crate::path_planning::TrajectoryGenerator;
use crate::perception::{LaneProximityAggregator, ProximityReport};

/// Simulator control period
const DEFAULT_FRAME_PERIOD: Duration = Duration::from_millis(20);

/// Result of planning one frame
#[derive(Debug, Clone)]
pub struct FramePlan {
    pub path: Path2D,
    pub decision: BehaviorDecision,
    pub report: ProximityReport,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct HighwayPlanner {
    map: RoadMap,
    aggregator: LaneProximityAggregator,
    behavior: BehaviorPlanner,
    trajectory: TrajectoryGenerator,
    frame_period: Duration,
}

impl HighwayPlanner {
    /// Build a planner from a validated configuration
    pub fn new(map: RoadMap, config: &PlannerConfig) -> PlannerResult<Self> {
        config.validate()?;
        let frame_period = Duration::try_from_secs_f64(config.perception.frame_period)
            .map_err(|e| {
                PlannerError::ConfigError(format!("perception.frame_period: {}", e))
            })?;
        Ok(Self::assemble(map, config, frame_period))
    }

    pub fn with_defaults(map: RoadMap) -> Self {
        Self::assemble(map, &PlannerConfig::default(), DEFAULT_FRAME_PERIOD)
    }

    /// Load the road map named in `config` and build a planner around it
    pub fn from_config(config: &PlannerConfig) -> PlannerResult<Self> {
        config.validate()?;
        let map = RoadMap::from_file(&config.road.map_file, config.road.max_s)?;
        Self::new(map, config)
    }

    fn assemble(map: RoadMap, config: &PlannerConfig, frame_period: Duration) -> Self {
        HighwayPlanner {
            map,
            aggregator: LaneProximityAggregator::new(config.perception.clone()),
            behavior: BehaviorPlanner::new(config.behavior.clone()),
            trajectory: TrajectoryGenerator::new(config.trajectory.clone()),
            frame_period,
        }
    }

    pub fn map(&self) -> &RoadMap {
        &self.map
    }

    pub fn behavior_state(&self) -> BehaviorState {
        self.behavior.state()
    }

    /// Plan one frame.
    ///
    /// When part of the previous path is still unconsumed, planning starts
    /// from its end: `end_path_s` replaces the measured `s`.
    pub fn plan(&mut self, telemetry: &Telemetry) -> PlannerResult<FramePlan> {
        let start = Instant::now();

        let unconsumed = telemetry.previous_path.len();
        let mut ego = telemetry.ego;
        if unconsumed > 0 {
            ego.s = telemetry.end_path_s;
        }

        let lane = self.behavior.state().current_lane;
        let report = self
            .aggregator
            .aggregate(ego.s, lane, &telemetry.neighbors, unconsumed);
        let decision = self.behavior.step(&report, telemetry.ego.d);
        let path = self.trajectory.generate(
            &self.map,
            &ego,
            decision.lane,
            decision.target_speed,
            &telemetry.previous_path,
        )?;

        let elapsed = start.elapsed();
        frame_overrun(elapsed, self.frame_period);

        Ok(FramePlan {
            path,
            decision,
            report,
            elapsed,
        })
    }
}

/// Log the planning latency; true when the frame missed its control period
fn frame_overrun(elapsed: Duration, frame_period: Duration) -> bool {
    if elapsed > frame_period {
        warn!(
            "frame took {:.2} ms, over the {:.2} ms control period",
            elapsed.as_secs_f64() * 1e3,
            frame_period.as_secs_f64() * 1e3
        );
        true
    } else {
        debug!("frame planned in {} us", elapsed.as_micros());
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{EgoState, Lane, LaneClass, NeighborVehicle, Point2D};
    use crate::mission_planning::FsmState;
    use std::f64::consts::FRAC_PI_2;

    fn ring() -> RoadMap {
        RoadMap::ring(Point2D::new(1000.0, 2000.0), 500.0, 200).unwrap()
    }

    /// Vehicle on the ring at `(s, d)`, driving counter-clockwise
    fn telemetry_at(map: &RoadMap, s: f64, d: f64) -> Telemetry {
        let p = map.to_cartesian(s, d);
        let heading = (p.y - 2000.0).atan2(p.x - 1000.0) + FRAC_PI_2;
        Telemetry::new(EgoState::new(p.x, p.y, heading, 0.0, s, d))
    }

    #[test]
    fn test_first_frame_on_free_road() {
        let map = ring();
        let telemetry = telemetry_at(&map, 0.0, 6.0);
        let mut planner = HighwayPlanner::with_defaults(map);
        let plan = planner.plan(&telemetry).unwrap();

        assert_eq!(plan.path.len(), 50);
        assert_eq!(plan.decision.fsm_state, FsmState::KeepLane);
        assert_eq!(plan.decision.lane, Lane::CENTER);
        assert!((plan.decision.target_speed - 0.224).abs() < 1e-12);
        assert_eq!(planner.behavior_state().target_speed, plan.decision.target_speed);
    }

    #[test]
    fn test_end_of_previous_path_replaces_measured_s() {
        let map = ring();
        let mut telemetry = telemetry_at(&map, 0.0, 6.0);
        telemetry.previous_path = Path2D::from_points(
            (1..=10).map(|i| map.to_cartesian(i as f64 * 2.0, 6.0)).collect(),
        );
        telemetry.end_path_s = 20.0;
        telemetry.end_path_d = 6.0;
        let car = map.to_cartesian(45.0, 6.0);
        telemetry.neighbors = vec![NeighborVehicle::new(3, car.x, car.y, 0.0, 0.0, 45.0, 6.0)];

        let mut planner = HighwayPlanner::with_defaults(map);
        let plan = planner.plan(&telemetry).unwrap();

        assert!((plan.report.front_gap(LaneClass::InLane) - 25.0).abs() < 1e-9);
        assert!(plan.report.too_close(LaneClass::InLane));
        assert_ne!(plan.decision.fsm_state, FsmState::KeepLane);
        assert_eq!(&plan.path.points[..10], &telemetry.previous_path.points[..]);
    }

    #[test]
    fn test_measured_s_used_without_previous_path() {
        let map = ring();
        let mut telemetry = telemetry_at(&map, 0.0, 6.0);
        telemetry.end_path_s = 20.0;
        telemetry.neighbors = vec![NeighborVehicle::new(3, 0.0, 0.0, 0.0, 0.0, 45.0, 6.0)];

        let mut planner = HighwayPlanner::with_defaults(map);
        let plan = planner.plan(&telemetry).unwrap();
        assert!((plan.report.front_gap(LaneClass::InLane) - 45.0).abs() < 1e-9);
        assert!(!plan.report.too_close(LaneClass::InLane));
    }

    #[test]
    fn test_from_config_missing_map_is_fatal() {
        let mut config = PlannerConfig::default();
        config.road.map_file = "/nonexistent/highway_map.csv".into();
        assert!(HighwayPlanner::from_config(&config).is_err());
    }

    #[test]
    fn test_invalid_frame_period_is_rejected() {
        for period in [-0.02, f64::NAN, 1e300] {
            let mut config = PlannerConfig::default();
            config.perception.frame_period = period;
            config.trajectory.frame_period = period;
            let err = HighwayPlanner::new(ring(), &config).unwrap_err();
            assert!(matches!(err, PlannerError::ConfigError(_)), "{}", period);
        }
    }

    #[test]
    fn test_new_matches_defaults() {
        let map = ring();
        let telemetry = telemetry_at(&map, 0.0, 6.0);
        let mut planner = HighwayPlanner::new(map.clone(), &PlannerConfig::default()).unwrap();
        let mut reference = HighwayPlanner::with_defaults(map);
        assert_eq!(planner.frame_period, reference.frame_period);

        let a = planner.plan(&telemetry).unwrap();
        let b = reference.plan(&telemetry).unwrap();
        assert_eq!(a.path, b.path);
    }

    #[test]
    fn test_frame_overrun() {
        let period = Duration::from_millis(20);
        assert!(frame_overrun(Duration::from_millis(21), period));
        assert!(!frame_overrun(Duration::from_millis(20), period));
        assert!(!frame_overrun(Duration::from_micros(350), period));
        assert!(frame_overrun(Duration::from_nanos(2), Duration::from_nanos(1)));
    }

    #[test]
    fn test_tiny_frame_period_still_plans() {
        let map = ring();
        let telemetry = telemetry_at(&map, 0.0, 6.0);
        let mut config = PlannerConfig::default();
        config.perception.frame_period = 1e-9;
        config.trajectory.frame_period = 1e-9;
        let mut planner = HighwayPlanner::new(map, &config).unwrap();

        let plan = planner.plan(&telemetry).unwrap();
        assert_eq!(plan.path.len(), 50);
        assert!(frame_overrun(plan.elapsed, planner.frame_period));
    }
}
