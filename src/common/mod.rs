//! Common types, traits, and error definitions for highway_path_planning
//!
//! This module provides the foundational building blocks shared by the
//! perception, behavior and trajectory stages.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
