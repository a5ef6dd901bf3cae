use mc_eval::{CutSolution, Interpolation};
use serde::{Deserialize, Serialize};

/// Number of points in the dense interpolated curves.
pub const DENSE_POINTS: usize = 400;

/// The selected threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutMarker {
    /// Threshold.
    pub cut: f64,
    /// FoM at the threshold.
    pub fom: f64,
    /// Efficiency at the threshold.
    pub efficiency: f64,
    /// Purity at the threshold.
    pub purity: f64,
}

/// Efficiency, purity and FoM vs threshold, sampled and interpolated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutCurveArtifact {
    /// Artifact schema identifier.
    pub schema_version: String,
    /// Score column.
    pub method: String,
    /// Interpolation used for the dense curves.
    pub interpolation: Interpolation,
    /// Candidate thresholds.
    pub thresholds: Vec<f64>,
    /// Sampled efficiency.
    pub efficiency: Vec<f64>,
    /// Sampled purity.
    pub purity: Vec<f64>,
    /// Sampled FoM.
    pub fom: Vec<f64>,
    /// Sampled FoM error.
    pub fom_err: Vec<f64>,
    /// Dense x grid spanning the thresholds.
    pub dense_x: Vec<f64>,
    /// Interpolated efficiency on `dense_x`.
    pub dense_efficiency: Vec<f64>,
    /// Interpolated purity on `dense_x`.
    pub dense_purity: Vec<f64>,
    /// Interpolated FoM on `dense_x`.
    pub dense_fom: Vec<f64>,
    /// Chosen cut.
    pub optimum: CutMarker,
}

impl CutCurveArtifact {
    /// Build from a solved cut.
    pub fn from_solution(solution: &CutSolution, interpolation: Interpolation) -> Self {
        let curve = &solution.curve;
        let lo = curve.thresholds.first().copied().unwrap_or(0.0);
        let hi = curve.thresholds.last().copied().unwrap_or(lo);
        let dense_x: Vec<f64> = (0..DENSE_POINTS)
            .map(|i| lo + (hi - lo) * i as f64 / (DENSE_POINTS - 1) as f64)
            .collect();
        let interp = &solution.interpolants;
        let opt = &solution.optimum;
        Self {
            schema_version: "mvacut_cut_curve_v0".to_string(),
            method: opt.method.clone(),
            interpolation,
            thresholds: curve.thresholds.clone(),
            efficiency: curve.efficiency(),
            purity: curve.purity(),
            fom: curve.fom(),
            fom_err: curve.metrics.iter().map(|m| m.fom_err).collect(),
            dense_efficiency: dense_x.iter().map(|&x| interp.efficiency_at(x)).collect(),
            dense_purity: dense_x.iter().map(|&x| interp.purity_at(x)).collect(),
            dense_fom: dense_x.iter().map(|&x| interp.fom_at(x)).collect(),
            dense_x,
            optimum: CutMarker {
                cut: opt.cut,
                fom: opt.fom,
                efficiency: opt.efficiency,
                purity: opt.purity,
            },
        }
    }
}
