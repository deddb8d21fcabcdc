// Natural cubic spline interpolation
//
// Piecewise cubic y = a + b*dx + c*dx^2 + d*dx^3 with continuous first and
// second derivatives and zero curvature at both ends.

extern crate nalgebra as na;

use crate::common::{Interpolator, PlannerError, PlannerResult};

#[derive(Debug, Clone)]
pub struct CubicSpline {
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
    x: Vec<f64>,
}

impl CubicSpline {
    pub fn new(x: &[f64], y: &[f64]) -> PlannerResult<CubicSpline> {
        if x.len() != y.len() {
            return Err(PlannerError::InvalidParameter(format!(
                "spline needs as many ordinates as abscissae, got {} and {}",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 2 {
            return Err(PlannerError::InvalidParameter(format!(
                "spline needs at least 2 samples, got {}",
                x.len()
            )));
        }
        for (index, pair) in x.windows(2).enumerate() {
            if !(pair[1] > pair[0]) {
                return Err(PlannerError::NonMonotonicSamples {
                    index: index + 1,
                    previous: pair[0],
                    current: pair[1],
                });
            }
        }

        let nx = x.len();
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let a = y.to_vec();
        let a_mat = Self::calc_a(&h);
        let b_mat = Self::calc_b(&h, &a);

        let c_na = a_mat
            .lu()
            .solve(&b_mat)
            .ok_or_else(|| PlannerError::NumericalError("singular spline system".to_string()))?;
        let c: Vec<f64> = c_na.iter().copied().collect();

        let mut b = Vec::with_capacity(nx - 1);
        let mut d = Vec::with_capacity(nx - 1);
        for i in 0..nx - 1 {
            d.push((c[i + 1] - c[i]) / (3.0 * h[i]));
            b.push((a[i + 1] - a[i]) / h[i] - h[i] * (c[i + 1] + 2.0 * c[i]) / 3.0);
        }

        Ok(CubicSpline {
            a,
            b,
            c,
            d,
            x: x.to_vec(),
        })
    }

    /// Value at `t`; outside the knots the end polynomials are extended
    pub fn calc(&self, t: f64) -> f64 {
        let i = self.search_index(t);
        let dx = t - self.x[i];
        self.a[i] + self.b[i] * dx + self.c[i] * dx.powi(2) + self.d[i] * dx.powi(3)
    }

    /// First derivative at `t`
    pub fn calcd(&self, t: f64) -> f64 {
        let i = self.search_index(t);
        let dx = t - self.x[i];
        self.b[i] + 2.0 * self.c[i] * dx + 3.0 * self.d[i] * dx.powi(2)
    }

    /// Second derivative at `t`
    pub fn calcdd(&self, t: f64) -> f64 {
        let i = self.search_index(t);
        let dx = t - self.x[i];
        2.0 * self.c[i] + 6.0 * self.d[i] * dx
    }

    fn search_index(&self, t: f64) -> usize {
        let last_segment = self.x.len() - 2;
        self.x
            .partition_point(|&xi| xi <= t)
            .saturating_sub(1)
            .min(last_segment)
    }

    fn calc_a(h: &[f64]) -> na::DMatrix<f64> {
        let nx = h.len() + 1;
        let mut a = na::DMatrix::zeros(nx, nx);
        a[(0, 0)] = 1.0;
        for i in 0..nx - 1 {
            if i != nx - 2 {
                a[(i + 1, i + 1)] = 2.0 * (h[i] + h[i + 1]);
            }
            a[(i + 1, i)] = h[i];
            a[(i, i + 1)] = h[i];
        }
        a[(0, 1)] = 0.0;
        a[(nx - 1, nx - 2)] = 0.0;
        a[(nx - 1, nx - 1)] = 1.0;
        a
    }

    fn calc_b(h: &[f64], a: &[f64]) -> na::DVector<f64> {
        let nx = h.len() + 1;
        let mut b = na::DVector::zeros(nx);
        for i in 0..nx - 2 {
            b[i + 1] = 3.0 * (a[i + 2] - a[i + 1]) / h[i + 1] - 3.0 * (a[i + 1] - a[i]) / h[i];
        }
        b
    }
}

impl Interpolator for CubicSpline {
    fn fit(x: &[f64], y: &[f64]) -> PlannerResult<Self> {
        CubicSpline::new(x, y)
    }

    fn evaluate(&self, t: f64) -> f64 {
        self.calc(t)
    }
}
