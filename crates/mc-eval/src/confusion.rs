//! Binary confusion matrix at a fixed threshold.

use std::fmt;
use std::str::FromStr;

use mc_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Normalization of the confusion matrix cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfusionMode {
    /// Raw event counts.
    #[default]
    Counts,
    /// Rows divided by true-class totals.
    Efficiency,
    /// Columns divided by predicted-class totals.
    Purity,
}

impl ConfusionMode {
    /// All modes.
    pub const ALL: [ConfusionMode; 3] =
        [ConfusionMode::Counts, ConfusionMode::Efficiency, ConfusionMode::Purity];

    /// File-name suffix (`_counts`, `_eff`, `_pur`).
    pub fn file_suffix(self) -> &'static str {
        match self {
            ConfusionMode::Counts => "_counts",
            ConfusionMode::Efficiency => "_eff",
            ConfusionMode::Purity => "_pur",
        }
    }
}

impl fmt::Display for ConfusionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfusionMode::Counts => "Counts",
            ConfusionMode::Efficiency => "Efficiency",
            ConfusionMode::Purity => "Purity",
        })
    }
}

impl FromStr for ConfusionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "counts" => Ok(ConfusionMode::Counts),
            "efficiency" | "eff" => Ok(ConfusionMode::Efficiency),
            "purity" | "pur" => Ok(ConfusionMode::Purity),
            _ => Err(Error::Config(format!(
                "unknown confusion mode '{s}' (expected counts, efficiency or purity)"
            ))),
        }
    }
}

/// Raw counts at one threshold. Pass criterion: `score > cut`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    /// Signal passing.
    pub tp: f64,
    /// Signal failing.
    #[serde(rename = "fn")]
    pub fn_: f64,
    /// Background passing.
    pub fp: f64,
    /// Background failing.
    pub tn: f64,
}

impl ConfusionCounts {
    /// Count both classes. Either class being empty is a data error.
    pub fn from_scores(signal: &[f64], background: &[f64], cut: f64) -> Result<Self> {
        if signal.is_empty() || background.is_empty() {
            return Err(Error::Data(format!(
                "signal ({}) or background ({}) set is empty; cannot build confusion matrix",
                signal.len(),
                background.len()
            )));
        }
        let total_signal = signal.len() as f64;
        let total_background = background.len() as f64;
        let tp = signal.iter().filter(|&&s| s > cut).count() as f64;
        let fp = background.iter().filter(|&&s| s > cut).count() as f64;
        Ok(Self { tp, fn_: total_signal - tp, fp, tn: total_background - fp })
    }

    /// `tp + fn`.
    pub fn total_signal(&self) -> f64 {
        self.tp + self.fn_
    }

    /// `fp + tn`.
    pub fn total_background(&self) -> f64 {
        self.fp + self.tn
    }

    /// Matrix in the requested normalization.
    pub fn normalized(&self, mode: ConfusionMode) -> ConfusionMatrix {
        let ratio = |a: f64, b: f64| if b > 0.0 { a / b } else { 0.0 };
        let (tp, fn_, fp, tn) = match mode {
            ConfusionMode::Counts => (self.tp, self.fn_, self.fp, self.tn),
            ConfusionMode::Efficiency => {
                let s = self.total_signal();
                let b = self.total_background();
                (ratio(self.tp, s), ratio(self.fn_, s), ratio(self.fp, b), ratio(self.tn, b))
            }
            ConfusionMode::Purity => {
                let pred_sig = self.tp + self.fp;
                let pred_bkg = self.tn + self.fn_;
                (
                    ratio(self.tp, pred_sig),
                    ratio(self.fn_, pred_bkg),
                    ratio(self.fp, pred_sig),
                    ratio(self.tn, pred_bkg),
                )
            }
        };
        ConfusionMatrix { mode, tp, fn_, fp, tn }
    }
}

/// Normalized 2×2 matrix. Rows are true class, columns predicted class,
/// signal first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Normalization applied.
    pub mode: ConfusionMode,
    /// True signal, predicted signal.
    pub tp: f64,
    /// True signal, predicted background.
    #[serde(rename = "fn")]
    pub fn_: f64,
    /// True background, predicted signal.
    pub fp: f64,
    /// True background, predicted background.
    pub tn: f64,
}

impl ConfusionMatrix {
    /// Cells as `[[tp, fn], [fp, tn]]`.
    pub fn cells(&self) -> [[f64; 2]; 2] {
        [[self.tp, self.fn_], [self.fp, self.tn]]
    }
}
