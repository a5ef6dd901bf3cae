//! Optimal classifier threshold by figure-of-merit maximization.
//!
//! Workflow:
//! 1. Histogram the score of each class over `[min_score, max_score]`.
//! 2. For every bin low edge (candidate threshold) take the signal and
//!    background integrals from that bin to the last as pass counts and
//!    compute [`MetricsRecord`]s.
//! 3. Interpolate efficiency, purity and FoM through the candidates.
//! 4. Maximize the FoM interpolant and report the cut with the interpolated
//!    efficiency and purity there.

use mc_core::{Error, Result};
use mc_table::{DEFAULT_KEY_COLUMN, Histogram1D, TableStore, UpsertOutcome, upsert_by_key};
use serde::{Deserialize, Serialize};

use crate::maximize::{MaximizerConfig, maximize_sampled};
use crate::metrics::MetricsRecord;
use crate::scores::ClassScores;
use crate::spline::{Interpolant, Interpolation};

/// Default results-log table.
pub const DEFAULT_RESULTS_TABLE: &str = "Performance";

/// Threshold scan settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CutScanConfig {
    /// Histogram bins (one candidate threshold per bin).
    pub n_bins: usize,
    /// Lowest expected score.
    pub min_score: f64,
    /// Highest expected score.
    pub max_score: f64,
    /// Interpolation through the sampled curves.
    pub interpolation: Interpolation,
    /// Brent refinement settings.
    #[serde(skip)]
    pub maximizer: MaximizerConfig,
}

impl Default for CutScanConfig {
    fn default() -> Self {
        Self {
            n_bins: 1000,
            min_score: -1.0,
            max_score: 1.0,
            interpolation: Interpolation::Natural,
            maximizer: MaximizerConfig::default(),
        }
    }
}

impl CutScanConfig {
    /// Reject unusable binnings before any data is read.
    pub fn validate(&self) -> Result<()> {
        if self.n_bins < 2 {
            return Err(Error::Config(format!(
                "cut scan needs at least 2 bins, got {}",
                self.n_bins
            )));
        }
        if !(self.min_score.is_finite()
            && self.max_score.is_finite()
            && self.min_score < self.max_score)
        {
            return Err(Error::Config(format!(
                "cut scan range must satisfy min < max, got [{}, {}]",
                self.min_score, self.max_score
            )));
        }
        Ok(())
    }
}

/// Sampled performance curve: one entry per candidate threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutCurve {
    /// Candidate thresholds (bin low edges), increasing.
    pub thresholds: Vec<f64>,
    /// Signal pass counts at each threshold.
    pub signal_pass: Vec<f64>,
    /// Background pass counts at each threshold.
    pub background_pass: Vec<f64>,
    /// Metrics at each threshold.
    pub metrics: Vec<MetricsRecord>,
    /// In-range signal integral.
    pub total_signal: f64,
    /// In-range background integral.
    pub total_background: f64,
}

impl CutCurve {
    /// Efficiency series.
    pub fn efficiency(&self) -> Vec<f64> {
        self.metrics.iter().map(|m| m.efficiency).collect()
    }

    /// Purity series.
    pub fn purity(&self) -> Vec<f64> {
        self.metrics.iter().map(|m| m.purity).collect()
    }

    /// Figure-of-merit series.
    pub fn fom(&self) -> Vec<f64> {
        self.metrics.iter().map(|m| m.fom).collect()
    }
}

/// Histogram both classes and sample the metrics at every bin low edge.
///
/// An empty in-range signal histogram is a data error.
pub fn scan_cut_curve(
    signal_scores: &[f64],
    background_scores: &[f64],
    config: &CutScanConfig,
) -> Result<CutCurve> {
    config.validate()?;
    let (n, lo, hi) = (config.n_bins, config.min_score, config.max_score);
    let h_sig = Histogram1D::from_values(n, lo, hi, signal_scores)?;
    let h_bkg = Histogram1D::from_values(n, lo, hi, background_scores)?;

    let total_signal = h_sig.integral();
    if total_signal <= 0.0 {
        return Err(Error::Data(format!(
            "signal score histogram over [{lo}, {hi}] is empty; cannot compute FoM"
        )));
    }
    let total_background = h_bkg.integral();

    let signal_pass = h_sig.cumulative_from_right();
    let background_pass = h_bkg.cumulative_from_right();
    let thresholds: Vec<f64> = (0..n).map(|i| h_sig.bin_low_edge(i)).collect();
    let metrics = signal_pass
        .iter()
        .zip(&background_pass)
        .map(|(&tp, &fp)| MetricsRecord::compute(tp, fp, total_signal))
        .collect();

    tracing::debug!(
        n_bins = n,
        total_signal,
        total_background,
        underflow = h_sig.underflow() + h_bkg.underflow(),
        overflow = h_sig.overflow() + h_bkg.overflow(),
        "sampled cut curve"
    );
    Ok(CutCurve { thresholds, signal_pass, background_pass, metrics, total_signal, total_background })
}

/// Best threshold for one method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimalCut {
    /// Score column name.
    pub method: String,
    /// Threshold maximizing the interpolated FoM.
    pub cut: f64,
    /// Interpolated FoM at the cut.
    pub fom: f64,
    /// Interpolated efficiency at the cut.
    pub efficiency: f64,
    /// Interpolated purity at the cut.
    pub purity: f64,
    /// `true` if the cut lies between candidate thresholds.
    pub refined: bool,
}

impl OptimalCut {
    /// Fields logged to the results table, keyed by method.
    pub fn log_values(&self) -> Vec<(String, f64)> {
        vec![
            ("MaxCut".to_string(), self.cut),
            ("Efficiency".to_string(), self.efficiency),
            ("Purity".to_string(), self.purity),
            ("FoM".to_string(), self.fom),
        ]
    }
}

/// Interpolants through a [`CutCurve`].
///
/// Cubic interpolants can overshoot next to steep edges of the sampled
/// curves; evaluations are clamped to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct CurveInterpolants {
    efficiency: Interpolant,
    purity: Interpolant,
    fom: Interpolant,
}

impl CurveInterpolants {
    /// Interpolate each series of `curve` with `kind`.
    pub fn new(curve: &CutCurve, kind: Interpolation) -> Result<Self> {
        let x = curve.thresholds.clone();
        Ok(Self {
            efficiency: Interpolant::new(kind, x.clone(), curve.efficiency())?,
            purity: Interpolant::new(kind, x.clone(), curve.purity())?,
            fom: Interpolant::new(kind, x, curve.fom())?,
        })
    }

    /// Efficiency at threshold `x`.
    pub fn efficiency_at(&self, x: f64) -> f64 {
        unit_interval(self.efficiency.eval(x))
    }

    /// Purity at threshold `x`.
    pub fn purity_at(&self, x: f64) -> f64 {
        unit_interval(self.purity.eval(x))
    }

    /// Figure of merit at threshold `x`.
    pub fn fom_at(&self, x: f64) -> f64 {
        unit_interval(self.fom.eval(x))
    }
}

fn unit_interval(v: f64) -> f64 {
    if v.is_nan() { v } else { v.clamp(0.0, 1.0) }
}

/// Optimal cut together with the curve it was derived from.
#[derive(Debug, Clone)]
pub struct CutSolution {
    /// The optimum.
    pub optimum: OptimalCut,
    /// Sampled curve.
    pub curve: CutCurve,
    /// Interpolants through the curve.
    pub interpolants: CurveInterpolants,
}

/// Find the FoM-maximizing threshold for `method` from raw scores.
pub fn find_optimal_cut(
    method: &str,
    signal_scores: &[f64],
    background_scores: &[f64],
    config: &CutScanConfig,
) -> Result<CutSolution> {
    tracing::info!(method, "computing optimal cut");
    let curve = scan_cut_curve(signal_scores, background_scores, config)?;
    let interpolants = CurveInterpolants::new(&curve, config.interpolation)?;

    let best = maximize_sampled(
        |x| interpolants.fom_at(x),
        &curve.thresholds,
        &curve.fom(),
        config.min_score,
        config.max_score,
        &config.maximizer,
    )?;

    let optimum = OptimalCut {
        method: method.to_string(),
        cut: best.x,
        fom: best.value,
        efficiency: interpolants.efficiency_at(best.x),
        purity: interpolants.purity_at(best.x),
        refined: best.refined,
    };
    tracing::info!(
        method,
        cut = optimum.cut,
        fom = optimum.fom,
        efficiency = optimum.efficiency,
        purity = optimum.purity,
        "optimal cut"
    );
    Ok(CutSolution { optimum, curve, interpolants })
}

/// Find the optimal cut for `method` from the `Signal`/`Background` tables
/// of a store.
pub fn optimal_cut_from_store(
    store: &TableStore,
    method: &str,
    config: &CutScanConfig,
) -> Result<CutSolution> {
    config.validate()?;
    let scores = ClassScores::from_store(store, method)?;
    find_optimal_cut(method, &scores.signal, &scores.background, config)
}

/// Record an optimum in a keyed results table (key column `Method`).
pub fn log_optimal_cut(
    results: &TableStore,
    table: &str,
    optimum: &OptimalCut,
) -> Result<UpsertOutcome> {
    let outcome =
        upsert_by_key(results, table, DEFAULT_KEY_COLUMN, &optimum.method, &optimum.log_values())?;
    tracing::info!(
        results = %results.path().display(),
        table,
        method = optimum.method.as_str(),
        ?outcome,
        "logged optimal cut"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn curve_counts_are_suffix_integrals() {
        let cfg = CutScanConfig { n_bins: 4, min_score: 0.0, max_score: 1.0, ..Default::default() };
        let curve = scan_cut_curve(&[0.1, 0.6, 0.9, 0.95], &[0.1, 0.3, 0.6], &cfg).unwrap();
        assert_eq!(curve.thresholds, vec![0.0, 0.25, 0.5, 0.75]);
        assert_eq!(curve.signal_pass, vec![4.0, 3.0, 3.0, 2.0]);
        assert_eq!(curve.background_pass, vec![3.0, 2.0, 1.0, 0.0]);
        assert_relative_eq!(curve.metrics[2].efficiency, 0.75);
        assert_relative_eq!(curve.metrics[2].purity, 0.75);
        assert_relative_eq!(curve.metrics[3].purity, 1.0);
    }

    #[test]
    fn out_of_range_signal_is_a_data_error() {
        let err =
            scan_cut_curve(&[5.0, 7.0], &[0.0], &CutScanConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = CutScanConfig { n_bins: 0, ..Default::default() };
        assert!(matches!(scan_cut_curve(&[0.0], &[0.0], &cfg), Err(Error::Config(_))));
        let cfg = CutScanConfig { n_bins: 1, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
        let cfg = CutScanConfig { min_score: 1.0, max_score: -1.0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn separable_classes() {
        let sig: Vec<f64> = (0..100).map(|i| 0.5 + 0.004 * i as f64).collect();
        let bkg: Vec<f64> = (0..100).map(|i| -0.9 + 0.004 * i as f64).collect();
        let cfg = CutScanConfig { n_bins: 200, interpolation: Interpolation::Linear, ..Default::default() };
        let sol = find_optimal_cut("score", &sig, &bkg, &cfg).unwrap();
        assert!(sol.optimum.cut > -0.504 && sol.optimum.cut <= 0.5);
        assert_relative_eq!(sol.optimum.fom, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn natural_spline_results_stay_in_unit_interval() {
        let sig: Vec<f64> = (0..100).map(|i| 0.5 + 0.004 * i as f64).collect();
        let bkg: Vec<f64> = (0..100).map(|i| -0.9 + 0.004 * i as f64).collect();
        let coarse = CutScanConfig { n_bins: 20, ..Default::default() };
        let cases = [
            (sig, bkg, CutScanConfig::default()),
            (vec![0.3, 0.35, 0.6, 0.8], vec![-0.2, 0.1, 0.32], coarse),
        ];
        for (sig, bkg, cfg) in cases {
            assert_eq!(cfg.interpolation, Interpolation::Natural);
            let sol = find_optimal_cut("score", &sig, &bkg, &cfg).unwrap();
            let o = &sol.optimum;
            for v in [o.efficiency, o.purity, o.fom] {
                assert!((0.0..=1.0).contains(&v), "{o:?}");
            }
            for i in 0..=200 {
                let x = -1.0 + 0.01 * i as f64;
                assert!((0.0..=1.0).contains(&sol.interpolants.efficiency_at(x)));
                assert!((0.0..=1.0).contains(&sol.interpolants.purity_at(x)));
                assert!((0.0..=1.0).contains(&sol.interpolants.fom_at(x)));
            }
        }
    }

    #[test]
    fn log_values_use_result_names() {
        let opt = OptimalCut {
            method: "BDT".into(),
            cut: 0.1,
            fom: 0.2,
            efficiency: 0.3,
            purity: 0.4,
            refined: false,
        };
        let names: Vec<String> = opt.log_values().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["MaxCut", "Efficiency", "Purity", "FoM"]);
    }
}
