use mc_eval::{GraphSeries, GraphType, PerformanceGraph};
use serde::{Deserialize, Serialize};

/// Per-method performance vs true energy with error bars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyPerformanceArtifact {
    /// Artifact schema identifier.
    pub schema_version: String,
    /// Plotted quantity.
    pub graph_type: GraphType,
    /// X-axis label.
    pub x_label: String,
    /// Y-axis label.
    pub y_label: String,
    /// Bin midpoints.
    pub x: Vec<f64>,
    /// One series per method.
    pub series: Vec<GraphSeries>,
}

impl EnergyPerformanceArtifact {
    /// Build from a graph; `x_label` names the binning covariate.
    pub fn new(graph: PerformanceGraph, x_label: &str) -> Self {
        Self {
            schema_version: "mvacut_energy_performance_v0".to_string(),
            graph_type: graph.graph_type,
            x_label: x_label.to_string(),
            y_label: graph.graph_type.label().to_string(),
            x: graph.x,
            series: graph.series,
        }
    }
}
