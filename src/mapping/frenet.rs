//! Transforms between Cartesian (x, y) and Frenet (s, d) coordinates
//!
//! `s` is the distance along the road centerline, `d` the signed lateral
//! offset, positive to the right of the direction of travel.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use itertools::Itertools;
use nalgebra::Vector2;
use ordered_float::OrderedFloat;

use super::road_map::RoadMap;
use crate::common::Point2D;

impl RoadMap {
    /// Index of the waypoint closest to `(x, y)`
    pub fn nearest_waypoint_index(&self, x: f64, y: f64) -> usize {
        let p = Point2D::new(x, y);
        self.waypoints
            .iter()
            .enumerate()
            .min_by_key(|(_, wp)| OrderedFloat(wp.position().distance(&p)))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Index of the first waypoint ahead of a vehicle at `(x, y)` heading `heading` [rad]
    pub fn next_waypoint_index(&self, x: f64, y: f64, heading: f64) -> usize {
        let nearest = self.nearest_waypoint_index(x, y);
        let bearing = Point2D::new(x, y).bearing_to(&self.waypoints[nearest].position());
        let angle = normalize_angle(heading - bearing).abs();

        if angle > FRAC_PI_4 {
            (nearest + 1) % self.waypoints.len()
        } else {
            nearest
        }
    }

    /// Cartesian to Frenet, returns `(s, d)`
    pub fn to_frenet(&self, x: f64, y: f64, heading: f64) -> (f64, f64) {
        let mut next = self.next_waypoint_index(x, y, heading);
        let mut prev = self.previous_index(next);

        // a large lateral offset can push the 45 degree rule one waypoint too far
        let start = self.waypoints[prev].position().to_vector();
        let along = self.waypoints[next].position().to_vector() - start;
        if (Vector2::new(x, y) - start).dot(&along) < 0.0 {
            next = prev;
            prev = self.previous_index(prev);
        }

        let origin = self.waypoints[prev].position().to_vector();
        let n = self.waypoints[next].position().to_vector() - origin;
        let v = Vector2::new(x, y) - origin;

        // projection of v onto the segment
        let n_sq = n.norm_squared();
        let proj = if n_sq > 0.0 { n * (v.dot(&n) / n_sq) } else { Vector2::zeros() };

        let mut d = (v - proj).norm();
        let center = self.reference_point.to_vector() - origin;
        if (center - v).norm() <= (center - proj).norm() {
            d = -d;
        }

        let s = self.waypoints[..=prev]
            .iter()
            .tuple_windows()
            .map(|(a, b)| a.position().distance(&b.position()))
            .sum::<f64>()
            + proj.norm();

        (s, d)
    }

    fn previous_index(&self, index: usize) -> usize {
        if index == 0 {
            self.waypoints.len() - 1
        } else {
            index - 1
        }
    }

    /// Frenet to Cartesian
    pub fn to_cartesian(&self, s: f64, d: f64) -> Point2D {
        let count = self.waypoints.len();
        let s = s.rem_euclid(self.max_s);

        // last waypoint with s_i <= s; before the first one we are on the closing segment
        let (prev, seg_s) = match self.waypoints.partition_point(|wp| wp.s <= s) {
            0 => (count - 1, s + self.max_s - self.waypoints[count - 1].s),
            i => (i - 1, s - self.waypoints[i - 1].s),
        };
        let next = (prev + 1) % count;

        let start = self.waypoints[prev].position();
        let heading = start.bearing_to(&self.waypoints[next].position());

        let seg_x = start.x + seg_s * heading.cos();
        let seg_y = start.y + seg_s * heading.sin();

        let perp_heading = heading - FRAC_PI_2;
        Point2D::new(seg_x + d * perp_heading.cos(), seg_y + d * perp_heading.sin())
    }
}

/// Wrap to `[-PI, PI)`; non-finite input yields NaN
fn normalize_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}
