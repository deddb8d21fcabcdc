//! Common traits defining interfaces between planner components

use crate::common::error::PlannerResult;

/// Smooth interpolation over samples with strictly increasing abscissae
pub trait Interpolator: Sized {
    /// Fit the interpolant through `(x[i], y[i])`.
    ///
    /// Implementations must reject `x` that is not strictly increasing.
    fn fit(x: &[f64], y: &[f64]) -> PlannerResult<Self>;

    /// Evaluate the interpolant at `t`
    fn evaluate(&self, t: f64) -> f64;
}
