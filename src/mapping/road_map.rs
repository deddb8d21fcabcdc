//! Road map: cyclic sequence of centerline waypoints
//!
//! The map file holds one waypoint per line with five whitespace separated
//! fields: `x y s dx dy`, where `(dx, dy)` is the unit vector pointing to the
//! right of the direction of travel.

use std::f64::consts::PI;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info};

use crate::common::{PlannerError, PlannerResult, Point2D};

/// Track length of the default highway map [m]
pub const DEFAULT_MAX_S: f64 = 6945.554;

/// Point inside the default highway loop, used to sign lateral offsets
pub const DEFAULT_REFERENCE_POINT: Point2D = Point2D { x: 1000.0, y: 2000.0 };

const FIELDS_PER_RECORD: usize = 5;

/// Reference point on the road centerline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
    pub s: f64,
    pub dx: f64,
    pub dy: f64,
}

impl Waypoint {
    pub fn new(x: f64, y: f64, s: f64, dx: f64, dy: f64) -> Self {
        Self { x, y, s, dx, dy }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Immutable road geometry shared by all coordinate transforms
#[derive(Debug, Clone)]
pub struct RoadMap {
    pub(crate) waypoints: Vec<Waypoint>,
    pub(crate) max_s: f64,
    pub(crate) reference_point: Point2D,
}

impl RoadMap {
    /// Create a map from waypoints ordered by increasing `s`
    pub fn new(waypoints: Vec<Waypoint>, max_s: f64) -> PlannerResult<Self> {
        if waypoints.is_empty() {
            return Err(PlannerError::EmptyMap);
        }
        if waypoints.len() < 2 {
            return Err(PlannerError::InvalidParameter(
                "road map needs at least two waypoints".to_string(),
            ));
        }
        if !(max_s > 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "track length must be positive, got {}",
                max_s
            )));
        }
        if let Some(i) = (1..waypoints.len()).find(|&i| waypoints[i].s <= waypoints[i - 1].s) {
            return Err(PlannerError::MapFormat {
                line: i + 1,
                reason: format!(
                    "s must increase along the map ({} after {})",
                    waypoints[i].s,
                    waypoints[i - 1].s
                ),
            });
        }
        Ok(Self {
            waypoints,
            max_s,
            reference_point: DEFAULT_REFERENCE_POINT,
        })
    }

    /// Replace the interior point used to decide the sign of `d`
    pub fn with_reference_point(mut self, reference_point: Point2D) -> Self {
        self.reference_point = reference_point;
        self
    }

    /// Parse waypoint records from a reader
    pub fn from_reader<R: BufRead>(reader: R, max_s: f64) -> PlannerResult<Self> {
        let mut waypoints = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            waypoints.push(parse_record(&line, i + 1)?);
        }
        debug!("parsed {} waypoints", waypoints.len());
        Self::new(waypoints, max_s)
    }

    /// Load a waypoint file from disk
    pub fn from_file<P: AsRef<Path>>(path: P, max_s: f64) -> PlannerResult<Self> {
        let file = File::open(path.as_ref())?;
        let map = Self::from_reader(BufReader::new(file), max_s)?;
        info!(
            "loaded road map {} ({} waypoints, track length {:.3})",
            path.as_ref().display(),
            map.len(),
            map.max_s
        );
        Ok(map)
    }

    /// Closed circular track driven counter-clockwise around `center`.
    ///
    /// Waypoint `s` values are cumulative chord lengths, so the Frenet
    /// transforms are exact on this map.
    pub fn ring(center: Point2D, radius: f64, count: usize) -> PlannerResult<Self> {
        if count < 3 || !(radius > 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "ring needs radius > 0 and at least 3 waypoints (radius {}, count {})",
                radius, count
            )));
        }
        let chord = 2.0 * radius * (PI / count as f64).sin();
        let waypoints = (0..count)
            .map(|i| {
                let theta = 2.0 * PI * i as f64 / count as f64;
                Waypoint::new(
                    center.x + radius * theta.cos(),
                    center.y + radius * theta.sin(),
                    i as f64 * chord,
                    theta.cos(),
                    theta.sin(),
                )
            })
            .collect();
        Ok(Self::new(waypoints, chord * count as f64)?.with_reference_point(center))
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Longitudinal position at which the track wraps back to 0
    pub fn max_s(&self) -> f64 {
        self.max_s
    }

    pub fn reference_point(&self) -> Point2D {
        self.reference_point
    }
}

fn parse_record(line: &str, line_no: usize) -> PlannerResult<Waypoint> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != FIELDS_PER_RECORD {
        return Err(PlannerError::MapFormat {
            line: line_no,
            reason: format!(
                "expected {} fields, found {}",
                FIELDS_PER_RECORD,
                fields.len()
            ),
        });
    }

    let mut values = [0.0; FIELDS_PER_RECORD];
    for (value, field) in values.iter_mut().zip(fields.iter()) {
        *value = field.parse::<f64>().map_err(|_| PlannerError::MapFormat {
            line: line_no,
            reason: format!("invalid number '{}'", field),
        })?;
    }

    Ok(Waypoint::new(values[0], values[1], values[2], values[3], values[4]))
}
