//! Bracketed 1-D maximization of a sampled curve.
//!
//! The sample grid picks the bracket: the lowest abscissa attaining the
//! largest sampled value, widened to its neighbours. Brent's method (argmin
//! `BrentOpt`, minimizing the negated function) refines inside the bracket.
//! The sampled point is kept unless refinement strictly improves on it.

use argmin::core::{CostFunction, Executor, State};
use argmin::solver::brent::BrentOpt;
use mc_core::{Error, Result};

/// Brent refinement settings.
#[derive(Debug, Clone, Copy)]
pub struct MaximizerConfig {
    /// Maximum Brent iterations.
    pub max_iters: u64,
    /// Relative tolerance on the abscissa.
    pub rel_tol: f64,
    /// Absolute tolerance on the abscissa.
    pub abs_tol: f64,
}

impl Default for MaximizerConfig {
    fn default() -> Self {
        Self { max_iters: 200, rel_tol: 1e-10, abs_tol: 1e-12 }
    }
}

/// Location and value of a maximum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Maximum {
    /// Abscissa of the maximum.
    pub x: f64,
    /// Function value there.
    pub value: f64,
    /// `true` if Brent refinement improved on the best sample.
    pub refined: bool,
}

struct Negated<F> {
    f: F,
}

impl<F: Fn(f64) -> f64> CostFunction for Negated<F> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, x: &f64) -> std::result::Result<f64, argmin::core::Error> {
        Ok(-(self.f)(*x))
    }
}

/// Index of the first maximal value (NaN samples are ignored).
pub fn first_argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some(b) if values[b] >= v => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Maximize `f` given its samples `ys` at increasing abscissae `xs`.
///
/// The search never leaves `[lo, hi]`.
pub fn maximize_sampled<F>(
    f: F,
    xs: &[f64],
    ys: &[f64],
    lo: f64,
    hi: f64,
    config: &MaximizerConfig,
) -> Result<Maximum>
where
    F: Fn(f64) -> f64,
{
    if xs.len() != ys.len() || xs.is_empty() {
        return Err(Error::Computation(format!(
            "maximizer needs matching non-empty samples, got {} x and {} y",
            xs.len(),
            ys.len()
        )));
    }
    let i = first_argmax(ys)
        .ok_or_else(|| Error::Computation("every sampled value is NaN".into()))?;
    let best = Maximum { x: xs[i], value: ys[i], refined: false };

    let a = if i == 0 { lo } else { xs[i - 1] }.max(lo);
    let b = if i + 1 == xs.len() { hi } else { xs[i + 1] }.min(hi);
    if !(a < b) {
        return Ok(best);
    }

    let solver = BrentOpt::new(a, b).set_tolerance(config.rel_tol, config.abs_tol);
    let res = Executor::new(Negated { f: &f }, solver)
        .configure(|state| state.max_iters(config.max_iters))
        .run()
        .map_err(|e| Error::Computation(format!("Brent refinement failed: {e}")))?;

    let state = res.state();
    let Some(&x) = state.get_best_param() else {
        return Ok(best);
    };
    let value = f(x);
    if value > best.value && (lo..=hi).contains(&x) {
        tracing::debug!(sample_x = best.x, x, value, "refined maximum");
        return Ok(Maximum { x, value, refined: true });
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid(lo: f64, hi: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64).collect()
    }

    #[test]
    fn refines_between_samples() {
        let f = |x: f64| -(x - 0.123).powi(2);
        let xs = grid(-1.0, 1.0, 21);
        let ys: Vec<f64> = xs.iter().map(|&x| f(x)).collect();
        let m = maximize_sampled(f, &xs, &ys, -1.0, 1.0, &MaximizerConfig::default()).unwrap();
        assert!(m.refined);
        assert_relative_eq!(m.x, 0.123, epsilon = 1e-6);
    }

    #[test]
    fn ties_choose_lowest_sample() {
        let xs = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let ys = vec![0.1, 0.5, 0.2, 0.5, 0.1];
        assert_eq!(first_argmax(&ys), Some(1));
        // Piecewise-flat function: refinement cannot improve on the sample.
        let f = |x: f64| if (0.5..1.5).contains(&x) || (2.5..3.5).contains(&x) { 0.5 } else { 0.1 };
        let m = maximize_sampled(f, &xs, &ys, 0.0, 4.0, &MaximizerConfig::default()).unwrap();
        assert_eq!(m.x, 1.0);
        assert!(!m.refined);
    }

    #[test]
    fn maximum_at_boundary_stays_in_range() {
        let f = |x: f64| x;
        let xs = grid(0.0, 1.0, 11);
        let ys = xs.clone();
        let m = maximize_sampled(f, &xs, &ys, 0.0, 1.0, &MaximizerConfig::default()).unwrap();
        assert!(m.x <= 1.0);
        assert_relative_eq!(m.value, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn nan_samples_ignored() {
        assert_eq!(first_argmax(&[f64::NAN, 0.3, 0.2]), Some(1));
        assert_eq!(first_argmax(&[f64::NAN]), None);
        assert!(
            maximize_sampled(|_| 0.0, &[0.0], &[f64::NAN], 0.0, 1.0, &Default::default()).is_err()
        );
    }
}
