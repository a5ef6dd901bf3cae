//! Performance-vs-energy graphs read back from the energy-binned `data` table.

use std::fmt;
use std::str::FromStr;

use mc_core::{Error, Result};
use mc_table::{EventTable, TableStore};
use serde::{Deserialize, Serialize};

use crate::energy_bins::ENERGY_TABLE;

/// Quantity plotted on the y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    /// `<method>_eff`.
    Efficiency,
    /// `<method>_pur`.
    Purity,
    /// `<method>_fom`.
    #[serde(rename = "fom")]
    FoM,
}

impl GraphType {
    /// All graph types in output order.
    pub const ALL: [GraphType; 3] = [GraphType::Efficiency, GraphType::Purity, GraphType::FoM];

    /// Column suffix of the value.
    pub fn suffix(self) -> &'static str {
        match self {
            GraphType::Efficiency => "_eff",
            GraphType::Purity => "_pur",
            GraphType::FoM => "_fom",
        }
    }

    /// Axis label.
    pub fn label(self) -> &'static str {
        match self {
            GraphType::Efficiency => "Efficiency",
            GraphType::Purity => "Purity",
            GraphType::FoM => "FoM",
        }
    }
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GraphType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "efficiency" | "eff" => Ok(GraphType::Efficiency),
            "purity" | "pur" => Ok(GraphType::Purity),
            "fom" => Ok(GraphType::FoM),
            _ => Err(Error::Config(format!(
                "unknown graph type '{s}' (expected eff, pur or fom)"
            ))),
        }
    }
}

/// One method's points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSeries {
    /// Method name.
    pub method: String,
    /// Values per bin.
    pub y: Vec<f64>,
    /// Symmetric errors per bin.
    pub y_err: Vec<f64>,
}

/// Energy performance graph for several methods sharing the bin midpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceGraph {
    /// Plotted quantity.
    pub graph_type: GraphType,
    /// Bin midpoints.
    pub x: Vec<f64>,
    /// One series per method.
    pub series: Vec<GraphSeries>,
}

/// Build the graph from an in-memory `data` table.
pub fn performance_graph(
    data: &EventTable,
    methods: &[String],
    graph_type: GraphType,
) -> Result<PerformanceGraph> {
    if data.n_rows() == 0 {
        return Err(Error::Data(format!("table '{}' has no rows", data.name())));
    }
    let x = data.f64_column("binMid")?.to_vec();
    let mut series = Vec::with_capacity(methods.len());
    for m in methods {
        let value = format!("{m}{}", graph_type.suffix());
        let error = format!("{value}_err");
        series.push(GraphSeries {
            method: m.clone(),
            y: data.f64_column(&value)?.to_vec(),
            y_err: data.f64_column(&error)?.to_vec(),
        });
    }
    tracing::debug!(graph = %graph_type, points = x.len(), methods = methods.len(), "built graph");
    Ok(PerformanceGraph { graph_type, x, series })
}

/// Read the `data` table of `store` and build the graph.
pub fn performance_graph_from_store(
    store: &TableStore,
    methods: &[String],
    graph_type: GraphType,
) -> Result<PerformanceGraph> {
    let data = store.read_table(ENERGY_TABLE)?;
    performance_graph(&data, methods, graph_type)
}
