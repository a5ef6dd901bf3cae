//! Signal/background score distributions for overlay plots.

use std::fmt;
use std::str::FromStr;

use mc_core::{Error, Result};
use mc_table::Histogram1D;
use serde::{Deserialize, Serialize};

/// Y-axis scaling requested for the overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisScale {
    /// Linear axes.
    #[default]
    Linear,
    /// Logarithmic y axis.
    LogY,
}

impl AxisScale {
    /// File-name suffix (`_linear`, `_logy`).
    pub fn file_suffix(self) -> &'static str {
        match self {
            AxisScale::Linear => "_linear",
            AxisScale::LogY => "_logy",
        }
    }
}

impl fmt::Display for AxisScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AxisScale::Linear => "Linear",
            AxisScale::LogY => "LogY",
        })
    }
}

impl FromStr for AxisScale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(AxisScale::Linear),
            "logy" | "log" => Ok(AxisScale::LogY),
            _ => Err(Error::Config(format!("unknown axis scale '{s}' (expected linear or logy)"))),
        }
    }
}

/// Binning of the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreHistConfig {
    /// Number of bins (must be positive).
    pub n_bins: usize,
    /// Lower histogram edge.
    pub min: f64,
    /// Upper histogram edge.
    pub max: f64,
    /// Axis scaling.
    pub axis_scale: AxisScale,
}

impl Default for ScoreHistConfig {
    fn default() -> Self {
        Self { n_bins: 50, min: -1.0, max: 1.0, axis_scale: AxisScale::Linear }
    }
}

impl ScoreHistConfig {
    /// Reject unusable binnings.
    pub fn validate(&self) -> Result<()> {
        if self.n_bins == 0 {
            return Err(Error::Config("number of bins must be greater than zero".into()));
        }
        if !(self.min.is_finite() && self.max.is_finite() && self.min < self.max) {
            return Err(Error::Config(format!(
                "histogram range must satisfy min < max, got [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Observed `[min, max]` of a score sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    /// Smallest finite score.
    pub min: f64,
    /// Largest finite score.
    pub max: f64,
}

impl ScoreRange {
    /// Range of the finite values, `None` if there are none.
    pub fn of(values: &[f64]) -> Option<Self> {
        values.iter().copied().filter(|v| v.is_finite()).fold(None, |acc, v| {
            Some(match acc {
                None => ScoreRange { min: v, max: v },
                Some(r) => ScoreRange { min: r.min.min(v), max: r.max.max(v) },
            })
        })
    }
}

/// Histogrammed score distributions of both classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreDistribution {
    /// Score column.
    pub method: String,
    /// Bin edges (`n_bins + 1`).
    pub bin_edges: Vec<f64>,
    /// Signal counts per bin.
    pub signal: Vec<f64>,
    /// Background counts per bin.
    pub background: Vec<f64>,
    /// Observed signal score range.
    pub signal_range: Option<ScoreRange>,
    /// Observed background score range.
    pub background_range: Option<ScoreRange>,
    /// Requested axis scaling.
    pub axis_scale: AxisScale,
    /// Shape separation of the unit-normalized histograms.
    pub separation: f64,
}

/// Shape separation `½ Σ (s−b)²/(s+b)` of two histograms after normalizing
/// each to unit area. 0 for identical shapes, 1 for disjoint ones.
pub fn separation(signal: &Histogram1D, background: &Histogram1D) -> f64 {
    let s = signal.normalized();
    let b = background.normalized();
    0.5 * s
        .iter()
        .zip(&b)
        .filter(|(si, bi)| *si + *bi > 0.0)
        .map(|(si, bi)| (si - bi).powi(2) / (si + bi))
        .sum::<f64>()
}

/// Histogram both classes' scores for `method`.
pub fn score_distribution(
    method: &str,
    signal: &[f64],
    background: &[f64],
    config: &ScoreHistConfig,
) -> Result<ScoreDistribution> {
    config.validate()?;
    let h_sig = Histogram1D::from_values(config.n_bins, config.min, config.max, signal)?;
    let h_bkg = Histogram1D::from_values(config.n_bins, config.min, config.max, background)?;

    let signal_range = ScoreRange::of(signal);
    let background_range = ScoreRange::of(background);
    tracing::info!(method, ?signal_range, ?background_range, "score ranges");

    Ok(ScoreDistribution {
        method: method.to_string(),
        bin_edges: (0..=config.n_bins).map(|i| h_sig.bin_low_edge(i)).collect(),
        signal: h_sig.counts().to_vec(),
        background: h_bkg.counts().to_vec(),
        signal_range,
        background_range,
        axis_scale: config.axis_scale,
        separation: separation(&h_sig, &h_bkg),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_bins_is_config_error() {
        let cfg = ScoreHistConfig { n_bins: 0, ..Default::default() };
        assert!(matches!(score_distribution("m", &[0.0], &[0.0], &cfg), Err(Error::Config(_))));
    }

    #[test]
    fn separation_limits() {
        let cfg = ScoreHistConfig { n_bins: 10, ..Default::default() };
        let same = score_distribution("m", &[0.1, 0.5], &[0.1, 0.5], &cfg).unwrap();
        assert_relative_eq!(same.separation, 0.0);
        let apart = score_distribution("m", &[0.9, 0.8], &[-0.9, -0.8], &cfg).unwrap();
        assert_relative_eq!(apart.separation, 1.0);
    }

    #[test]
    fn ranges_and_edges() {
        let cfg = ScoreHistConfig { n_bins: 4, min: 0.0, max: 1.0, axis_scale: AxisScale::LogY };
        let d = score_distribution("m", &[0.2, 0.7, 3.0], &[], &cfg).unwrap();
        assert_eq!(d.bin_edges, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(d.signal_range, Some(ScoreRange { min: 0.2, max: 3.0 }));
        assert_eq!(d.background_range, None);
        assert_eq!(d.signal, vec![1.0, 0.0, 1.0, 0.0]);
        assert_eq!(d.axis_scale.file_suffix(), "_logy");
    }
}
