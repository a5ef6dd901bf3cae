use mc_eval::{ConfusionCounts, ConfusionMode};
use serde::{Deserialize, Serialize};

/// 2×2 confusion matrix; rows are the true class, columns the predicted one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrixArtifact {
    /// Artifact schema identifier.
    pub schema_version: String,
    /// Score column.
    pub method: String,
    /// Threshold (`score > cut` predicts signal).
    pub cut: f64,
    /// Normalization.
    pub mode: ConfusionMode,
    /// Row and column labels.
    pub labels: [String; 2],
    /// `[[tp, fn], [fp, tn]]` in the requested normalization.
    pub matrix: [[f64; 2]; 2],
    /// Raw counts.
    pub counts: ConfusionCounts,
}

impl ConfusionMatrixArtifact {
    /// Build from raw counts.
    pub fn new(method: &str, cut: f64, counts: ConfusionCounts, mode: ConfusionMode) -> Self {
        Self {
            schema_version: "mvacut_confusion_matrix_v0".to_string(),
            method: method.to_string(),
            cut,
            mode,
            labels: ["Signal".to_string(), "Background".to_string()],
            matrix: counts.normalized(mode).cells(),
            counts,
        }
    }
}
