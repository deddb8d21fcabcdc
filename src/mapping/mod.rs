// Road geometry module: waypoint map and Frenet coordinate transforms

pub mod road_map;
pub mod frenet;

pub use road_map::{RoadMap, Waypoint, DEFAULT_MAX_S, DEFAULT_REFERENCE_POINT};
