// Path planning module

pub mod cubic_spline;
pub mod trajectory_generator;

pub use cubic_spline::CubicSpline;
pub use trajectory_generator::{TrajectoryConfig, TrajectoryGenerator};
