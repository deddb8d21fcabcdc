//! Trajectory generator
//!
//! Turns the lane and speed chosen by the behavior planner into a fixed
//! length sequence of global path points. The unconsumed tail of the previous
//! path is re-emitted unchanged and extended along a curve fitted through a
//! few sparse anchors, so consecutive frames join without a kink.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cubic_spline::CubicSpline;
use crate::common::{EgoState, Interpolator, Lane, Path2D, PlannerResult, Point2D};
use crate::mapping::RoadMap;

/// Configuration for trajectory generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectoryConfig {
    /// Number of points in every emitted path
    pub horizon: usize,
    /// Distance in `s` between the sparse anchors [m]
    pub anchor_spacing: f64,
    pub anchor_count: usize,
    /// Local x of the point used to convert speed into a point spacing [m]
    pub lookahead: f64,
    /// Time between consecutive path points [s]
    pub frame_period: f64,
    /// Divisor converting mph into m/s
    pub mph_to_mps: f64,
    /// Lane width [m]
    pub lane_width: f64,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            horizon: 50,
            anchor_spacing: 30.0,
            anchor_count: 3,
            lookahead: 30.0,
            frame_period: 0.02,
            mph_to_mps: 2.24,
            lane_width: 4.0,
        }
    }
}

/// Local vehicle frame: origin at the reference point, x along the heading
#[derive(Debug, Clone, Copy)]
struct LocalFrame {
    origin: Point2D,
    heading: f64,
}

impl LocalFrame {
    fn to_local(&self, p: Point2D) -> (f64, f64) {
        let shift_x = p.x - self.origin.x;
        let shift_y = p.y - self.origin.y;
        let (sin, cos) = (-self.heading).sin_cos();
        (shift_x * cos - shift_y * sin, shift_x * sin + shift_y * cos)
    }

    fn to_global(&self, x: f64, y: f64) -> Point2D {
        let (sin, cos) = self.heading.sin_cos();
        Point2D::new(
            self.origin.x + x * cos - y * sin,
            self.origin.y + x * sin + y * cos,
        )
    }
}

/// Smooth path generator
#[derive(Debug, Clone)]
pub struct TrajectoryGenerator {
    config: TrajectoryConfig,
}

impl TrajectoryGenerator {
    pub fn new(config: TrajectoryConfig) -> Self {
        TrajectoryGenerator { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(TrajectoryConfig::default())
    }

    pub fn config(&self) -> &TrajectoryConfig {
        &self.config
    }

    /// Generate a path with a natural cubic spline through the anchors
    pub fn generate(
        &self,
        map: &RoadMap,
        ego: &EgoState,
        lane: Lane,
        target_speed: f64,
        previous_path: &Path2D,
    ) -> PlannerResult<Path2D> {
        self.generate_with::<CubicSpline>(map, ego, lane, target_speed, previous_path)
    }

    /// Generate a path, fitting the anchors with interpolator `I`.
    ///
    /// `ego.s` must already be the longitudinal position the new segment
    /// starts from, i.e. the end of the previous path when one is left.
    /// `target_speed` is in mph.
    pub fn generate_with<I: Interpolator>(
        &self,
        map: &RoadMap,
        ego: &EgoState,
        lane: Lane,
        target_speed: f64,
        previous_path: &Path2D,
    ) -> PlannerResult<Path2D> {
        let horizon = self.config.horizon;
        let kept = &previous_path.points[..previous_path.len().min(horizon)];

        let (frame, mut anchors) = self.heading_anchors(ego, kept);
        let d = lane.center_d(self.config.lane_width);
        for i in 1..=self.config.anchor_count {
            anchors.push(map.to_cartesian(ego.s + i as f64 * self.config.anchor_spacing, d));
        }

        let (xs, ys): (Vec<f64>, Vec<f64>) = anchors.iter().map(|&p| frame.to_local(p)).unzip();
        let curve = I::fit(&xs, &ys)?;

        let mut path = Path2D::with_capacity(horizon);
        for &p in kept {
            path.push(p);
        }

        let step = self.point_step(&curve, target_speed);
        let mut x_add_on = 0.0;
        while path.len() < horizon {
            let x_point = x_add_on + step;
            let y_point = curve.evaluate(x_point);
            x_add_on = x_point;
            path.push(frame.to_global(x_point, y_point));
        }

        debug!(
            "trajectory: {} kept + {} new points, lane {}, step {:.4}",
            kept.len(),
            horizon - kept.len(),
            lane.index(),
            step
        );
        Ok(path)
    }

    /// Reference frame and the two anchors fixing the heading at its origin
    fn heading_anchors(&self, ego: &EgoState, kept: &[Point2D]) -> (LocalFrame, Vec<Point2D>) {
        let mut anchors = Vec::with_capacity(2 + self.config.anchor_count);

        if let [.., prev, last] = kept {
            // a stopped vehicle leaves coincident points with no heading
            if prev.distance(last) > f64::EPSILON {
                anchors.push(*prev);
                anchors.push(*last);
                let frame = LocalFrame {
                    origin: *last,
                    heading: prev.bearing_to(last),
                };
                return (frame, anchors);
            }
        }

        let (origin, heading) = match kept.last() {
            Some(&last) if kept.len() >= 2 => (last, ego.heading),
            _ => (ego.position(), ego.heading),
        };
        anchors.push(Point2D::new(origin.x - heading.cos(), origin.y - heading.sin()));
        anchors.push(origin);
        (LocalFrame { origin, heading }, anchors)
    }

    /// Local x increment between new points for the requested speed [mph]
    fn point_step<I: Interpolator>(&self, curve: &I, target_speed: f64) -> f64 {
        if target_speed <= 0.0 {
            return 0.0;
        }
        let target_x = self.config.lookahead;
        let target_y = curve.evaluate(target_x);
        let target_dist = target_x.hypot(target_y);
        let n = target_dist / (self.config.frame_period * target_speed / self.config.mph_to_mps);
        target_x / n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PlannerError;
    use crate::mapping::Waypoint;

    const EGO_X: f64 = 100.0;

    /// Straight road along +x; positive d lies at negative y
    fn straight_road() -> RoadMap {
        let waypoints = (0..20)
            .map(|i| {
                let s = i as f64 * 30.0;
                Waypoint::new(s, 0.0, s, 0.0, -1.0)
            })
            .collect();
        RoadMap::new(waypoints, 600.0)
            .unwrap()
            .with_reference_point(Point2D::new(300.0, 1000.0))
    }

    fn ego_at(x: f64, d: f64) -> EgoState {
        EgoState::new(x, -d, 0.0, 40.0, x, d)
    }

    fn lane_center_path(len: usize, spacing: f64) -> Path2D {
        Path2D::from_points(
            (1..=len)
                .map(|i| Point2D::new(EGO_X + i as f64 * spacing, -6.0))
                .collect(),
        )
    }

    #[test]
    fn test_horizon_is_always_full() {
        let map = straight_road();
        let generator = TrajectoryGenerator::with_defaults();
        for len in 0..=50 {
            let previous = lane_center_path(len, 0.4);
            let end_s = previous.last().map_or(EGO_X, |p| p.x);
            let ego = EgoState::new(EGO_X, -6.0, 0.0, 40.0, end_s, 6.0);
            let path = generator
                .generate(&map, &ego, Lane::CENTER, 40.0, &previous)
                .unwrap();
            assert_eq!(path.len(), 50, "previous path of {} points", len);
            assert_eq!(&path.points[..len], &previous.points[..]);
        }
    }

    #[test]
    fn test_long_previous_path_is_truncated() {
        let map = straight_road();
        let generator = TrajectoryGenerator::with_defaults();
        let previous = lane_center_path(70, 0.4);
        let ego = ego_at(EGO_X, 6.0);
        let path = generator.generate(&map, &ego, Lane::CENTER, 40.0, &previous).unwrap();
        assert_eq!(path.len(), 50);
        assert_eq!(&path.points[..], &previous.points[..50]);
    }

    #[test]
    fn test_point_spacing_matches_speed() {
        let map = straight_road();
        let generator = TrajectoryGenerator::with_defaults();
        let path = generator
            .generate(&map, &ego_at(EGO_X, 6.0), Lane::CENTER, 49.0, &Path2D::new())
            .unwrap();
        let expected = 0.02 * 49.0 / 2.24;
        let mut previous = Point2D::new(EGO_X, -6.0);
        for p in &path.points {
            assert!((previous.distance(p) - expected).abs() < 1e-6);
            assert!((p.y + 6.0).abs() < 1e-6);
            previous = *p;
        }
    }

    #[test]
    fn test_continues_previous_path_smoothly() {
        let map = straight_road();
        let generator = TrajectoryGenerator::with_defaults();
        let spacing = 0.02 * 49.0 / 2.24;
        let previous = lane_center_path(10, spacing);
        let last = previous.points[9];
        let ego = EgoState::new(EGO_X, -6.0, 0.0, 49.0, last.x, 6.0);
        let path = generator.generate(&map, &ego, Lane::CENTER, 49.0, &previous).unwrap();
        assert!((path.points[10].distance(&last) - spacing).abs() < 1e-6);
        assert!(path.points[10].x > last.x);
    }

    #[test]
    fn test_previous_heading_overrides_telemetry() {
        let map = straight_road();
        let generator = TrajectoryGenerator::with_defaults();
        let previous = lane_center_path(5, 0.4);
        let end_s = previous.points[4].x;
        let straight = EgoState::new(EGO_X, -6.0, 0.0, 40.0, end_s, 6.0);
        let skewed = EgoState::new(EGO_X, -6.0, 0.3, 40.0, end_s, 6.0);
        let a = generator.generate(&map, &straight, Lane::CENTER, 40.0, &previous).unwrap();
        let b = generator.generate(&map, &skewed, Lane::CENTER, 40.0, &previous).unwrap();
        for (pa, pb) in a.points.iter().zip(b.points.iter()) {
            assert!(pa.distance(pb) < 1e-9);
        }
    }

    #[test]
    fn test_moves_towards_target_lane() {
        let map = straight_road();
        let generator = TrajectoryGenerator::new(TrajectoryConfig {
            horizon: 150,
            ..TrajectoryConfig::default()
        });
        let path = generator
            .generate(&map, &ego_at(EGO_X, 6.0), Lane::RIGHTMOST, 49.0, &Path2D::new())
            .unwrap();
        let ys = path.y_coords();
        assert!(ys.windows(2).take(50).all(|w| w[1] <= w[0] + 1e-9));
        let settled: Vec<f64> = path
            .points
            .iter()
            .filter(|p| p.x > EGO_X + 35.0)
            .map(|p| p.y)
            .collect();
        assert!(!settled.is_empty());
        assert!(settled.iter().all(|y| (y + 10.0).abs() < 0.75), "{:?}", settled);
    }

    #[test]
    fn test_zero_speed_holds_position() {
        let map = straight_road();
        let generator = TrajectoryGenerator::with_defaults();
        let path = generator
            .generate(&map, &ego_at(EGO_X, 6.0), Lane::CENTER, 0.0, &Path2D::new())
            .unwrap();
        assert_eq!(path.len(), 50);
        assert!(path.points.iter().all(|p| p.distance(&Point2D::new(EGO_X, -6.0)) < 1e-9));
    }

    #[test]
    fn test_stopped_previous_path_uses_telemetry_heading() {
        let map = straight_road();
        let generator = TrajectoryGenerator::with_defaults();
        let stopped = Path2D::from_points(vec![Point2D::new(EGO_X, -6.0); 3]);
        let ego = ego_at(EGO_X, 6.0);
        let path = generator.generate(&map, &ego, Lane::CENTER, 10.0, &stopped).unwrap();
        assert_eq!(path.len(), 50);
        assert!(path.points[3].x > EGO_X);
    }

    #[test]
    fn test_backwards_heading_is_rejected() {
        let map = straight_road();
        let generator = TrajectoryGenerator::with_defaults();
        let ego = EgoState::new(EGO_X, -6.0, std::f64::consts::PI, 10.0, EGO_X, 6.0);
        let result = generator.generate(&map, &ego, Lane::CENTER, 10.0, &Path2D::new());
        assert!(matches!(result, Err(PlannerError::NonMonotonicSamples { .. })));
    }
}
