//! Common types used throughout highway_path_planning

use nalgebra::Vector2;

/// Number of lanes on the carriageway the planner drives on
pub const LANE_COUNT: usize = 3;

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    /// Heading of the vector pointing from `self` to `other`
    pub fn bearing_to(&self, other: &Point2D) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }
}

/// Path represented as a sequence of 2D points
#[derive(Debug, Clone, PartialEq)]
pub struct Path2D {
    pub points: Vec<Point2D>,
}

impl Path2D {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn from_points(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    /// Build a path from parallel coordinate lists, ignoring any unmatched tail
    pub fn from_xy(x: &[f64], y: &[f64]) -> Self {
        let points = x
            .iter()
            .zip(y.iter())
            .map(|(&x, &y)| Point2D::new(x, y))
            .collect();
        Self { points }
    }

    pub fn push(&mut self, point: Point2D) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&Point2D> {
        self.points.last()
    }

    pub fn x_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn y_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }

    pub fn total_length(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.points.windows(2).map(|w| w[0].distance(&w[1])).sum()
    }
}

impl Default for Path2D {
    fn default() -> Self {
        Self::new()
    }
}

/// Lateral direction of a lane change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
}

/// Position of a neighbor's lane relative to the ego lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneClass {
    InLane,
    Left,
    Right,
}

impl LaneClass {
    pub const ALL: [LaneClass; 3] = [LaneClass::InLane, LaneClass::Left, LaneClass::Right];

    /// Absolute lane this class refers to, if it exists on the road
    pub fn lane(self, ego_lane: Lane) -> Option<Lane> {
        match self {
            LaneClass::InLane => Some(ego_lane),
            LaneClass::Left => ego_lane.adjacent(Direction::Left),
            LaneClass::Right => ego_lane.adjacent(Direction::Right),
        }
    }
}

impl From<Direction> for LaneClass {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Left => LaneClass::Left,
            Direction::Right => LaneClass::Right,
        }
    }
}

/// Lane index, 0 is the leftmost lane and `LANE_COUNT - 1` the rightmost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lane(usize);

impl Lane {
    pub const LEFTMOST: Lane = Lane(0);
    pub const CENTER: Lane = Lane(1);
    pub const RIGHTMOST: Lane = Lane(LANE_COUNT - 1);

    pub fn new(index: usize) -> Option<Self> {
        if index < LANE_COUNT {
            Some(Lane(index))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// Lateral offset of the lane centre
    pub fn center_d(self, lane_width: f64) -> f64 {
        lane_width / 2.0 + self.0 as f64 * lane_width
    }

    /// Whether `d` lies strictly inside this lane's band
    pub fn contains_d(self, d: f64, lane_width: f64) -> bool {
        (d - self.center_d(lane_width)).abs() < lane_width / 2.0
    }

    /// Lane whose band contains `d`, if any
    pub fn from_d(d: f64, lane_width: f64) -> Option<Self> {
        (0..LANE_COUNT)
            .map(Lane)
            .find(|lane| lane.contains_d(d, lane_width))
    }

    /// Neighboring lane in `direction`, `None` past the road edge
    pub fn adjacent(self, direction: Direction) -> Option<Lane> {
        match direction {
            Direction::Left => self.0.checked_sub(1).map(Lane),
            Direction::Right => Lane::new(self.0 + 1),
        }
    }
}

impl Default for Lane {
    fn default() -> Self {
        Lane::CENTER
    }
}

/// Pose and road-relative position of the controlled vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EgoState {
    pub x: f64,
    pub y: f64,
    /// Heading [rad]
    pub heading: f64,
    /// Speed [mph]
    pub speed: f64,
    pub s: f64,
    pub d: f64,
}

impl EgoState {
    pub fn new(x: f64, y: f64, heading: f64, speed: f64, s: f64, d: f64) -> Self {
        Self {
            x,
            y,
            heading,
            speed,
            s,
            d,
        }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Snapshot of another vehicle, valid for a single frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborVehicle {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub s: f64,
    pub d: f64,
}

impl NeighborVehicle {
    pub fn new(id: i64, x: f64, y: f64, vx: f64, vy: f64, s: f64, d: f64) -> Self {
        Self {
            id,
            x,
            y,
            vx,
            vy,
            s,
            d,
        }
    }

    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }
}

/// Everything the planner receives for one control frame
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub ego: EgoState,
    /// Unconsumed tail of the previously issued path
    pub previous_path: Path2D,
    pub end_path_s: f64,
    pub end_path_d: f64,
    pub neighbors: Vec<NeighborVehicle>,
}

impl Telemetry {
    pub fn new(ego: EgoState) -> Self {
        Self {
            ego,
            previous_path: Path2D::new(),
            end_path_s: 0.0,
            end_path_d: 0.0,
            neighbors: Vec::new(),
        }
    }
}
