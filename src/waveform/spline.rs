//! Quadratic interpolating B-spline on explicit (x, y) arrays.
//!
//! Knot vector for n points: x₀ three times, the midpoints between
//! consecutive points except the first and last midpoint, then xₙ₋₁ three
//! times (n + 3 knots, n coefficients). With that layout every data point
//! falls in its own knot span, so the collocation matrix is tridiagonal and
//! B-spline collocation is totally positive: elimination needs no pivoting.

use thiserror::Error;

const DEGREE: usize = 2;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplineError {
    #[error("need at least 3 points, got {0}")]
    TooFewPoints(usize),
    #[error("x and y lengths differ ({0} vs {1})")]
    LengthMismatch(usize, usize),
    #[error("x values must be finite and strictly increasing")]
    NotIncreasing,
}

#[derive(Debug, Clone)]
pub struct QuadraticSpline {
    knots: Vec<f64>,
    coefs: Vec<f64>,
}

impl QuadraticSpline {
    /// Fit the spline passing through every `(xs[i], ys[i])`.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Result<Self, SplineError> {
        let n = xs.len();
        if n != ys.len() {
            return Err(SplineError::LengthMismatch(n, ys.len()));
        }
        if n < 3 {
            return Err(SplineError::TooFewPoints(n));
        }
        let increasing = xs.iter().all(|x| x.is_finite()) && xs.windows(2).all(|w| w[0] < w[1]);
        if !increasing {
            return Err(SplineError::NotIncreasing);
        }

        let mut knots = Vec::with_capacity(n + DEGREE + 1);
        knots.extend([xs[0]; DEGREE + 1]);
        knots.extend((1..n - 2).map(|i| (xs[i] + xs[i + 1]) / 2.0));
        knots.extend([xs[n - 1]; DEGREE + 1]);

        let mut spline = Self {
            knots,
            coefs: Vec::new(),
        };

        // Tridiagonal collocation system: row i touches columns i-1..=i+1
        let mut lower = vec![0.0; n];
        let mut diag = vec![0.0; n];
        let mut upper = vec![0.0; n];
        for (i, &x) in xs.iter().enumerate() {
            let span = spline.span(x);
            let basis = spline.basis(span, x);
            for (j, &b) in basis.iter().enumerate() {
                if b == 0.0 {
                    continue;
                }
                let col = span - DEGREE + j;
                match col as isize - i as isize {
                    -1 => lower[i] = b,
                    0 => diag[i] = b,
                    1 => upper[i] = b,
                    _ => return Err(SplineError::NotIncreasing),
                }
            }
        }

        spline.coefs = solve_tridiagonal(&lower, &diag, &upper, ys);
        Ok(spline)
    }

    /// Evaluate at `x`. Outside the fitted range the end pieces are extended.
    pub fn eval(&self, x: f64) -> f64 {
        let span = self.span(x);
        let basis = self.basis(span, x);
        basis
            .iter()
            .enumerate()
            .map(|(j, b)| b * self.coefs[span - DEGREE + j])
            .sum()
    }

    /// Index s of the knot interval [t_s, t_s+1) containing `x`, restricted to
    /// the non-degenerate spans. The right end belongs to the last span.
    fn span(&self, x: f64) -> usize {
        let n = self.coefs_len();
        self.knots
            .partition_point(|&k| k <= x)
            .saturating_sub(1)
            .clamp(DEGREE, n - 1)
    }

    /// The DEGREE + 1 basis functions that are nonzero on `span`, evaluated at
    /// `x` (Cox-de Boor, triangular scheme).
    fn basis(&self, span: usize, x: f64) -> [f64; DEGREE + 1] {
        let t = &self.knots;
        let mut n = [0.0; DEGREE + 1];
        let mut left = [0.0; DEGREE + 1];
        let mut right = [0.0; DEGREE + 1];
        n[0] = 1.0;
        for j in 1..=DEGREE {
            left[j] = x - t[span + 1 - j];
            right[j] = t[span + j] - x;
            let mut saved = 0.0;
            for r in 0..j {
                let denom = right[r + 1] + left[j - r];
                let temp = if denom == 0.0 { 0.0 } else { n[r] / denom };
                n[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            n[j] = saved;
        }
        n
    }

    fn coefs_len(&self) -> usize {
        self.knots.len() - DEGREE - 1
    }
}

/// Thomas algorithm. `lower[0]` and `upper[n-1]` are ignored.
fn solve_tridiagonal(lower: &[f64], diag: &[f64], upper: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = diag.len();
    let mut c = vec![0.0; n];
    let mut d = vec![0.0; n];

    c[0] = upper[0] / diag[0];
    d[0] = rhs[0] / diag[0];
    for i in 1..n {
        let m = diag[i] - lower[i] * c[i - 1];
        c[i] = if i + 1 < n { upper[i] / m } else { 0.0 };
        d[i] = (rhs[i] - lower[i] * d[i - 1]) / m;
    }

    let mut x = vec![0.0; n];
    x[n - 1] = d[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d[i] - c[i] * x[i + 1];
    }
    x
}
