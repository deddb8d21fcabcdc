//! Lane change cost model
//!
//! The cost of moving one lane in a direction is the free room missing in
//! front on that side: `max_front_cost - front_gap`. Lower is better. Moving
//! off the road is never allowed and gets the fixed `edge_lane_cost`.

use super::behavior_planner::BehaviorConfig;
use crate::common::{Direction, Lane};
use crate::perception::ProximityReport;

/// Cost of changing from `lane` one lane towards `direction`, in `[0, edge_lane_cost]`
pub fn lane_change_cost(
    lane: Lane,
    direction: Direction,
    report: &ProximityReport,
    config: &BehaviorConfig,
) -> f64 {
    match lane.adjacent(direction) {
        None => config.edge_lane_cost,
        Some(_) => (config.max_front_cost - report.front_gap(direction.into()))
            .clamp(0.0, config.edge_lane_cost),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::NeighborVehicle;
    use crate::perception::LaneProximityAggregator;

    fn report_with(ego_lane: Lane, neighbors: &[NeighborVehicle]) -> ProximityReport {
        LaneProximityAggregator::with_defaults().aggregate(100.0, ego_lane, neighbors, 0)
    }

    fn parked(s: f64, d: f64) -> NeighborVehicle {
        NeighborVehicle::new(0, 0.0, 0.0, 0.0, 0.0, s, d)
    }

    #[test]
    fn test_edge_lane_cost() {
        let config = BehaviorConfig::default();
        let crowded = [parked(105.0, 2.0), parked(105.0, 6.0), parked(105.0, 10.0)];
        for neighbors in [&[][..], &crowded[..]] {
            let left = report_with(Lane::LEFTMOST, neighbors);
            assert_eq!(lane_change_cost(Lane::LEFTMOST, Direction::Left, &left, &config), 100.0);
            let right = report_with(Lane::RIGHTMOST, neighbors);
            assert_eq!(lane_change_cost(Lane::RIGHTMOST, Direction::Right, &right, &config), 100.0);
        }
    }

    #[test]
    fn test_clear_side_costs_nothing() {
        let config = BehaviorConfig::default();
        let report = report_with(Lane::CENTER, &[]);
        assert_eq!(lane_change_cost(Lane::CENTER, Direction::Left, &report, &config), 0.0);
        assert_eq!(lane_change_cost(Lane::CENTER, Direction::Right, &report, &config), 0.0);
    }

    #[test]
    fn test_cost_decreases_with_front_gap() {
        let config = BehaviorConfig::default();
        let costs: Vec<f64> = [5.0, 15.0, 25.0, 35.0, 45.0]
            .iter()
            .map(|gap| {
                let report = report_with(Lane::CENTER, &[parked(100.0 + gap, 10.0)]);
                lane_change_cost(Lane::CENTER, Direction::Right, &report, &config)
            })
            .collect();
        assert!(costs.windows(2).all(|w| w[1] < w[0]), "{:?}", costs);
        assert!(costs.iter().all(|&c| (0.0..=100.0).contains(&c)));
        assert!((costs[0] - 45.0).abs() < 1e-12);
    }

    #[test]
    fn test_cost_ignores_cars_behind() {
        let config = BehaviorConfig::default();
        let report = report_with(Lane::CENTER, &[parked(95.0, 2.0)]);
        assert_eq!(lane_change_cost(Lane::CENTER, Direction::Left, &report, &config), 0.0);
    }
}
