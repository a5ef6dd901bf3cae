//! 1-D interpolation through sampled curves.
//!
//! Three schemes are available:
//! - `Natural`: natural cubic spline (zero second derivative at both ends)
//! - `Monotone`: Fritsch–Carlson monotone cubic Hermite
//! - `Linear`: piecewise linear
//!
//! Outside `[x₀, xₖ]` every interpolant is held flat at the boundary sample.

use std::fmt;
use std::str::FromStr;

use mc_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Interpolation scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Natural cubic spline.
    #[default]
    Natural,
    /// Monotone cubic Hermite (no overshoot between samples).
    Monotone,
    /// Piecewise linear.
    Linear,
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Interpolation::Natural => "natural",
            Interpolation::Monotone => "monotone",
            Interpolation::Linear => "linear",
        })
    }
}

impl FromStr for Interpolation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "natural" | "cubic" => Ok(Interpolation::Natural),
            "monotone" | "pchip" => Ok(Interpolation::Monotone),
            "linear" => Ok(Interpolation::Linear),
            _ => Err(Error::Config(format!(
                "unknown interpolation '{s}' (expected natural, monotone or linear)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
enum Coefficients {
    /// Second derivatives at the knots.
    Natural(Vec<f64>),
    /// Hermite slopes at the knots.
    Hermite(Vec<f64>),
    Linear,
}

/// Interpolant through `(x, y)` samples.
#[derive(Debug, Clone)]
pub struct Interpolant {
    x: Vec<f64>,
    y: Vec<f64>,
    coeffs: Coefficients,
}

impl Interpolant {
    /// Build an interpolant. Requires at least 2 finite samples with strictly
    /// increasing `x`.
    pub fn new(kind: Interpolation, x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        let k = x.len();
        if k < 2 {
            return Err(Error::Computation(format!(
                "interpolation requires at least 2 samples, got {k}"
            )));
        }
        if y.len() != k {
            return Err(Error::Computation(format!(
                "interpolation: x length ({k}) != y length ({})",
                y.len()
            )));
        }
        if let Some(i) = (0..k).find(|&i| !x[i].is_finite() || !y[i].is_finite()) {
            return Err(Error::Computation(format!(
                "interpolation: sample {i} is not finite (x={}, y={})",
                x[i], y[i]
            )));
        }
        if let Some(i) = (1..k).find(|&i| x[i] <= x[i - 1]) {
            return Err(Error::Computation(format!(
                "interpolation: x must be strictly increasing, but x[{}]={} >= x[{i}]={}",
                i - 1,
                x[i - 1],
                x[i]
            )));
        }

        let coeffs = match kind {
            Interpolation::Natural => Coefficients::Natural(natural_second_derivatives(&x, &y)),
            Interpolation::Monotone => Coefficients::Hermite(fritsch_carlson_slopes(&x, &y)),
            Interpolation::Linear => Coefficients::Linear,
        };
        Ok(Self { x, y, coeffs })
    }

    /// Evaluate at `t`.
    pub fn eval(&self, t: f64) -> f64 {
        let k = self.x.len();
        if t <= self.x[0] {
            return self.y[0];
        }
        if t >= self.x[k - 1] {
            return self.y[k - 1];
        }
        if t.is_nan() {
            return f64::NAN;
        }

        let i = (self.x.partition_point(|&v| v <= t) - 1).min(k - 2);
        let (x0, x1, y0, y1) = (self.x[i], self.x[i + 1], self.y[i], self.y[i + 1]);
        let h = x1 - x0;

        match &self.coeffs {
            Coefficients::Linear => y0 + (y1 - y0) * (t - x0) / h,
            Coefficients::Natural(m) => {
                let a = (x1 - t) / h;
                let b = (t - x0) / h;
                a * y0 + b * y1 + ((a * a * a - a) * m[i] + (b * b * b - b) * m[i + 1]) * h * h / 6.0
            }
            Coefficients::Hermite(m) => {
                let s = (t - x0) / h;
                let h00 = (1.0 + 2.0 * s) * (1.0 - s) * (1.0 - s);
                let h10 = s * (1.0 - s) * (1.0 - s);
                let h01 = s * s * (3.0 - 2.0 * s);
                let h11 = s * s * (s - 1.0);
                h00 * y0 + h10 * h * m[i] + h01 * y1 + h11 * h * m[i + 1]
            }
        }
    }
}

/// Second derivatives of the natural cubic spline (tridiagonal solve).
fn natural_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let k = x.len();
    let mut m = vec![0.0; k];
    if k < 3 {
        return m;
    }

    // Thomas algorithm on the interior knots 1..k-1.
    let n = k - 2;
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];
    for j in 0..n {
        let i = j + 1;
        let h0 = x[i] - x[i - 1];
        let h1 = x[i + 1] - x[i];
        let sub = h0;
        let diag = 2.0 * (h0 + h1);
        let sup = h1;
        let rhs = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
        if j == 0 {
            c_prime[j] = sup / diag;
            d_prime[j] = rhs / diag;
        } else {
            let denom = diag - sub * c_prime[j - 1];
            c_prime[j] = sup / denom;
            d_prime[j] = (rhs - sub * d_prime[j - 1]) / denom;
        }
    }
    for j in (0..n).rev() {
        m[j + 1] = if j + 1 == n { d_prime[j] } else { d_prime[j] - c_prime[j] * m[j + 2] };
    }
    m
}

/// Fritsch–Carlson monotone Hermite slopes.
fn fritsch_carlson_slopes(x: &[f64], y: &[f64]) -> Vec<f64> {
    let k = x.len();
    let delta: Vec<f64> = (0..k - 1).map(|i| (y[i + 1] - y[i]) / (x[i + 1] - x[i])).collect();

    let mut m = vec![0.0; k];
    m[0] = delta[0];
    m[k - 1] = delta[k - 2];
    for i in 1..k - 1 {
        m[i] = if delta[i - 1] * delta[i] <= 0.0 { 0.0 } else { 0.5 * (delta[i - 1] + delta[i]) };
    }

    for i in 0..k - 1 {
        if delta[i] == 0.0 {
            m[i] = 0.0;
            m[i + 1] = 0.0;
            continue;
        }
        let alpha = m[i] / delta[i];
        let beta = m[i + 1] / delta[i];
        let phi = alpha * alpha + beta * beta;
        if phi > 9.0 {
            let tau = 3.0 / phi.sqrt();
            m[i] = tau * alpha * delta[i];
            m[i + 1] = tau * beta * delta[i];
        }
    }
    m
}
