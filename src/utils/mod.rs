//! Utility modules for highway_path_planning

pub mod visualization;

pub use visualization::{colors, PathStyle, Visualizer};
