// Offline highway simulation.
//
// Drives the planner around a circular three lane track with randomly placed
// constant speed traffic and plots the final scene.
// Usage: highway_sim [seed] [steps]

use anyhow::Context;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use highway_path_planning::utils::{colors, PathStyle, Visualizer};
use highway_path_planning::{
    EgoState, FsmState, HighwayPlanner, Lane, NeighborVehicle, Path2D, Point2D, RoadMap,
    Telemetry, LANE_COUNT,
};

const LANE_WIDTH: f64 = 4.0;
const FRAME_PERIOD: f64 = 0.02;
const MPS_TO_MPH: f64 = 2.24;
/// Path points the vehicle drives between two planning cycles
const POINTS_PER_CYCLE: usize = 5;
const TRAFFIC: usize = 14;

/// Constant speed vehicle following its lane
struct TrafficCar {
    id: i64,
    s: f64,
    d: f64,
    speed: f64,
}

impl TrafficCar {
    fn advance(&mut self, dt: f64, max_s: f64) {
        self.s = (self.s + self.speed * dt).rem_euclid(max_s);
    }

    fn observe(&self, map: &RoadMap) -> NeighborVehicle {
        let p = map.to_cartesian(self.s, self.d);
        let heading = road_heading(map, self.s, self.d);
        NeighborVehicle::new(
            self.id,
            p.x,
            p.y,
            self.speed * heading.cos(),
            self.speed * heading.sin(),
            self.s,
            self.d,
        )
    }
}

fn road_heading(map: &RoadMap, s: f64, d: f64) -> f64 {
    map.to_cartesian(s, d).bearing_to(&map.to_cartesian(s + 0.5, d))
}

fn spawn_traffic(rng: &mut StdRng, max_s: f64) -> anyhow::Result<Vec<TrafficCar>> {
    let speed = Normal::<f64>::new(18.0, 3.0).context("invalid traffic speed distribution")?;
    Ok((0..TRAFFIC)
        .map(|i| {
            let lane = Lane::new(rng.gen_range(0..LANE_COUNT)).unwrap_or_default();
            TrafficCar {
                id: i as i64,
                s: rng.gen_range(40.0..max_s - 40.0),
                d: lane.center_d(LANE_WIDTH),
                speed: rng.sample(speed).clamp(8.0, 22.0),
            }
        })
        .collect())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("highway_path_planning=info,highway_sim=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let seed: u64 = match args.next() {
        Some(arg) => arg.parse().context("seed must be an unsigned integer")?,
        None => 7,
    };
    let steps: usize = match args.next() {
        Some(arg) => arg.parse().context("steps must be an unsigned integer")?,
        None => 3000,
    };

    let map = RoadMap::ring(Point2D::new(1000.0, 2000.0), 400.0, 180)?;
    let max_s = map.max_s();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut traffic = spawn_traffic(&mut rng, max_s)?;
    let mut planner = HighwayPlanner::with_defaults(map.clone());

    let start_d = Lane::CENTER.center_d(LANE_WIDTH);
    let start = map.to_cartesian(0.0, start_d);
    let mut ego = EgoState::new(start.x, start.y, road_heading(&map, 0.0, start_d), 0.0, 0.0, start_d);
    let mut remaining = Path2D::new();
    let mut trace = Path2D::new();
    let mut close_calls = 0;
    let mut lane_changes = 0;

    info!("simulating {} cycles with seed {}", steps, seed);
    for step in 0..steps {
        let mut telemetry = Telemetry::new(ego);
        telemetry.neighbors = traffic.iter().map(|car| car.observe(&map)).collect();
        if let Some(last) = remaining.last() {
            let heading = match remaining.points.len() {
                n if n >= 2 => remaining.points[n - 2].bearing_to(last),
                _ => ego.heading,
            };
            let (s, d) = map.to_frenet(last.x, last.y, heading);
            telemetry.end_path_s = s;
            telemetry.end_path_d = d;
        }
        telemetry.previous_path = remaining.clone();

        let plan = planner.plan(&telemetry)?;
        lane_changes += plan
            .decision
            .transitions
            .iter()
            .filter(|t| matches!(t.dst_state, FsmState::LaneChangeLeft | FsmState::LaneChangeRight))
            .count();

        // drive along the new path for one planning cycle
        let consumed = POINTS_PER_CYCLE.min(plan.path.len());
        let mut position = ego.position();
        let mut heading = ego.heading;
        let mut travelled = 0.0;
        for p in &plan.path.points[..consumed] {
            let step_len = position.distance(p);
            if step_len > 1e-6 {
                heading = position.bearing_to(p);
            }
            travelled += step_len;
            position = *p;
            trace.push(*p);
        }
        let elapsed = consumed as f64 * FRAME_PERIOD;
        let speed = if elapsed > 0.0 { travelled / elapsed * MPS_TO_MPH } else { 0.0 };
        let (s, d) = map.to_frenet(position.x, position.y, heading);
        ego = EgoState::new(position.x, position.y, heading, speed, s, d);
        remaining = Path2D::from_points(plan.path.points[consumed..].to_vec());

        for car in traffic.iter_mut() {
            car.advance(elapsed, max_s);
        }
        for car in &traffic {
            if (car.s - ego.s).abs() < 5.0 && (car.d - ego.d).abs() < 2.0 {
                close_calls += 1;
                warn!("step {}: vehicle {} within 5 m (s {:.1}, d {:.1})", step, car.id, car.s, car.d);
            }
        }

        if step % 250 == 0 {
            let state = planner.behavior_state();
            info!(
                "step {}: s {:.1} d {:.2} speed {:.1} mph, lane {}, {}",
                step,
                ego.s,
                ego.d,
                ego.speed,
                state.current_lane.index(),
                state.fsm_state
            );
        }
    }

    info!(
        "finished: {} lane changes, {} close calls, {:.1} m driven",
        lane_changes,
        close_calls,
        trace.total_length()
    );

    let neighbors: Vec<NeighborVehicle> = traffic.iter().map(|car| car.observe(&map)).collect();
    let mut vis = Visualizer::new();
    vis.set_title(&format!("Highway simulation (seed {})", seed))
        .plot_road(&map, LANE_WIDTH)
        .plot_path(&trace, &PathStyle::new(colors::TRACE, "Driven").with_line_width(1.0))
        .plot_neighbors(&neighbors)
        .plot_ego(&ego)
        .plot_path(&remaining, &PathStyle::default())
        .focus_on(ego.x, ego.y, 80.0);
    vis.save_png("highway_sim.png", 1000, 1000)
        .map_err(anyhow::Error::msg)
        .context("failed to write plot")?;
    info!("plot saved to highway_sim.png");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_traffic_is_seeded_and_bounded() {
        let max_s = 2000.0;
        let cars = spawn_traffic(&mut StdRng::seed_from_u64(3), max_s).unwrap();
        let again = spawn_traffic(&mut StdRng::seed_from_u64(3), max_s).unwrap();

        assert_eq!(cars.len(), TRAFFIC);
        for (car, twin) in cars.iter().zip(&again) {
            assert!((8.0..=22.0).contains(&car.speed));
            assert!((40.0..max_s - 40.0).contains(&car.s));
            assert!(Lane::from_d(car.d, LANE_WIDTH).is_some());
            assert_eq!(car.speed, twin.speed);
        }
    }
}
