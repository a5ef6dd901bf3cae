//! # mc-viz
//!
//! Visualization data artifacts for mvacut.
//!
//! Every artifact is a flat, plot-friendly JSON structure (arrays rather
//! than nested objects) carrying a `schema_version`. Rendering happens
//! downstream.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::path::Path;

use mc_core::Result;
use serde::Serialize;

/// Threshold scan curves with the chosen cut.
pub mod cut_curve;

/// Confusion matrix at a fixed threshold.
pub mod confusion;

/// Signal/background score overlays.
pub mod overlay;

/// Performance-vs-energy graphs.
pub mod energy;

pub use confusion::ConfusionMatrixArtifact;
pub use cut_curve::{CutCurveArtifact, CutMarker};
pub use energy::EnergyPerformanceArtifact;
pub use overlay::ScoreOverlayArtifact;

/// Write an artifact as pretty JSON, creating parent directories.
pub fn write_artifact<T: Serialize>(artifact: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(artifact)?)?;
    tracing::info!(path = %path.display(), "wrote artifact");
    Ok(())
}

/// `<stem><suffix>.json`.
pub fn artifact_file_name(stem: &str, suffix: &str) -> String {
    format!("{stem}{suffix}.json")
}
