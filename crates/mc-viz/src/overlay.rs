use mc_eval::{AxisScale, ScoreDistribution, ScoreRange};
use serde::{Deserialize, Serialize};

/// Signal and background score histograms overlaid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreOverlayArtifact {
    /// Artifact schema identifier.
    pub schema_version: String,
    /// Score column.
    pub method: String,
    /// Requested y-axis scaling.
    pub axis_scale: AxisScale,
    /// Bin edges (length = n_bins + 1).
    pub bin_edges: Vec<f64>,
    /// Signal counts.
    pub signal: Vec<f64>,
    /// Background counts.
    pub background: Vec<f64>,
    /// Signal shape normalized to unit area.
    pub signal_shape: Vec<f64>,
    /// Background shape normalized to unit area.
    pub background_shape: Vec<f64>,
    /// Observed signal range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_range: Option<ScoreRange>,
    /// Observed background range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_range: Option<ScoreRange>,
    /// Shape separation in `[0, 1]`.
    pub separation: f64,
}

fn unit_area(h: &[f64]) -> Vec<f64> {
    let sum: f64 = h.iter().sum();
    if sum <= 0.0 {
        return vec![0.0; h.len()];
    }
    h.iter().map(|v| v / sum).collect()
}

impl From<&ScoreDistribution> for ScoreOverlayArtifact {
    fn from(d: &ScoreDistribution) -> Self {
        Self {
            schema_version: "mvacut_score_overlay_v0".to_string(),
            method: d.method.clone(),
            axis_scale: d.axis_scale,
            bin_edges: d.bin_edges.clone(),
            signal: d.signal.clone(),
            background: d.background.clone(),
            signal_shape: unit_area(&d.signal),
            background_shape: unit_area(&d.background),
            signal_range: d.signal_range,
            background_range: d.background_range,
            separation: d.separation,
        }
    }
}
