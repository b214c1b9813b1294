//! Natural cubic-spline interpolation used to resample correlation
//! amplitudes onto the uniform velocity grid.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Minimum number of knots accepted by [`CubicSpline::fit`]; fewer points
/// cannot constrain a cubic segment.
pub const MIN_SPLINE_POINTS: usize = 4;

/// Cubic spline coefficients for a single curve.
///
/// Segment `i` covers `[knots[i], knots[i+1]]` and evaluates as
/// `a + b·dx + c·dx² + d·dx³` with `dx = x − knots[i]`.
#[derive(Serialize, Deserialize, Default, PartialEq, Debug, Clone)]
pub struct CubicSpline {
    pub knots: Array1<f64>,
    pub coeff_a: Array1<f64>,
    pub coeff_b: Array1<f64>,
    pub coeff_c: Array1<f64>,
    pub coeff_d: Array1<f64>,
}

impl CubicSpline {
    /// Fit a natural cubic spline through `(x, y)` pairs.
    ///
    /// `x` must be strictly increasing. Returns `None` when fewer than
    /// [`MIN_SPLINE_POINTS`] knots are supplied or the abscissae are not
    /// strictly increasing.
    pub fn fit(x: &[f64], y: &[f64]) -> Option<Self> {
        let n = x.len();
        if n < MIN_SPLINE_POINTS || y.len() != n {
            return None;
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }

        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

        // Thomas algorithm for the natural-boundary tridiagonal system in
        // the knot second derivatives.
        let mut diag = vec![0.0; n];
        let mut rhs = vec![0.0; n];
        diag[0] = 1.0;
        diag[n - 1] = 1.0;
        let mut upper = vec![0.0; n];
        let mut lower = vec![0.0; n];
        for i in 1..n - 1 {
            lower[i] = h[i - 1];
            diag[i] = 2.0 * (h[i - 1] + h[i]);
            upper[i] = h[i];
            rhs[i] = 6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
        }
        for i in 1..n {
            let w = lower[i] / diag[i - 1];
            diag[i] -= w * upper[i - 1];
            rhs[i] -= w * rhs[i - 1];
        }
        let mut m = vec![0.0; n];
        m[n - 1] = rhs[n - 1] / diag[n - 1];
        for i in (0..n - 1).rev() {
            m[i] = (rhs[i] - upper[i] * m[i + 1]) / diag[i];
        }

        let segments = n - 1;
        let mut a = Array1::zeros(segments);
        let mut b = Array1::zeros(segments);
        let mut c = Array1::zeros(segments);
        let mut d = Array1::zeros(segments);
        for i in 0..segments {
            a[i] = y[i];
            b[i] = (y[i + 1] - y[i]) / h[i] - h[i] * (2.0 * m[i] + m[i + 1]) / 6.0;
            c[i] = m[i] / 2.0;
            d[i] = (m[i + 1] - m[i]) / (6.0 * h[i]);
        }

        Some(CubicSpline {
            knots: Array1::from(x.to_vec()),
            coeff_a: a,
            coeff_b: b,
            coeff_c: c,
            coeff_d: d,
        })
    }

    /// Knot span `(first, last)`.
    pub fn span(&self) -> (f64, f64) {
        (self.knots[0], self.knots[self.knots.len() - 1])
    }

    /// Evaluate the spline at a single point.
    ///
    /// Outside the knot span the endpoint tangent is continued linearly.
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.knots.len();

        if x < self.knots[0] {
            let dx = x - self.knots[0];
            return self.coeff_a[0] + self.coeff_b[0] * dx;
        }
        if x > self.knots[n - 1] {
            let i = n - 2;
            let dx_end = self.knots[n - 1] - self.knots[i];
            let y_end = self.coeff_a[i]
                + self.coeff_b[i] * dx_end
                + self.coeff_c[i] * dx_end * dx_end
                + self.coeff_d[i] * dx_end * dx_end * dx_end;
            let slope_end = self.coeff_b[i]
                + 2.0 * self.coeff_c[i] * dx_end
                + 3.0 * self.coeff_d[i] * dx_end * dx_end;
            return y_end + slope_end * (x - self.knots[n - 1]);
        }

        // binary search for the segment containing x
        let mut left = 0;
        let mut right = n - 1;
        while right - left > 1 {
            let mid = (left + right) / 2;
            if self.knots[mid] > x {
                right = mid;
            } else {
                left = mid;
            }
        }

        let dx = x - self.knots[left];
        self.coeff_a[left]
            + self.coeff_b[left] * dx
            + self.coeff_c[left] * dx * dx
            + self.coeff_d[left] * dx * dx * dx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn interpolates_knots_exactly() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [1.0, -0.5, 2.0, 0.0, 1.5];
        let sp = CubicSpline::fit(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(y.iter()) {
            assert_relative_eq!(sp.eval(*xi), *yi, epsilon = 1e-10);
        }
    }

    #[test]
    fn reproduces_a_straight_line() {
        let x: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v - 3.0).collect();
        let sp = CubicSpline::fit(&x, &y).unwrap();
        for t in [0.5, 1.7, 3.3, 6.9] {
            assert_relative_eq!(sp.eval(t), 2.0 * t - 3.0, epsilon = 1e-9);
        }
        // linear extrapolation keeps the slope
        assert_relative_eq!(sp.eval(-1.0), -5.0, epsilon = 1e-9);
        assert_relative_eq!(sp.eval(9.0), 15.0, epsilon = 1e-9);
    }

    #[test]
    fn rejects_sparse_or_disordered_input() {
        assert!(CubicSpline::fit(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0]).is_none());
        assert!(CubicSpline::fit(&[0.0, 2.0, 1.0, 3.0], &[0.0; 4]).is_none());
    }

    #[test]
    fn smooth_between_knots() {
        // sin sampled at 9 knots should interpolate to ~sin between them
        let x: Vec<f64> = (0..9).map(|i| i as f64 * 0.5).collect();
        let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();
        let sp = CubicSpline::fit(&x, &y).unwrap();
        for t in [0.25, 1.1, 2.3, 3.6] {
            assert_relative_eq!(sp.eval(t), t.sin(), epsilon = 5e-3);
        }
    }
}
