//! Application of trained scoring models to events.
//!
//! Models are JSON artifacts of the form
//!
//! ```json
//! { "format": "logistic", "inputs": ["x", "y"], "weights": [0.5, -1.2], "bias": 0.1 }
//! ```
//!
//! The `format` selects a constructor from a process-wide registry. The
//! built-in formats are `linear` (`w·x + b`), `logistic` (sigmoid of the
//! linear response) and `tanh`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use mc_core::{Error, Result};
use mc_table::{Column, EventTable};
use serde::{Deserialize, Serialize};

/// A trained classifier mapping input variables to a score.
pub trait ScoringModel: Send + Sync {
    /// Input variable names, in the order `score` expects them.
    fn input_names(&self) -> &[String];

    /// Score for one event.
    fn score(&self, inputs: &[f64]) -> f64;
}

/// On-disk model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    /// Registered format name.
    pub format: String,
    /// Input variables.
    pub inputs: Vec<String>,
    /// One weight per input.
    pub weights: Vec<f64>,
    /// Constant term.
    #[serde(default)]
    pub bias: f64,
}

impl ModelFile {
    /// Read an artifact. A missing file is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Config(format!("model artifact not found: {}", path.display())));
        }
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            Error::Config(format!("invalid model artifact {}: {e}", path.display()))
        })
    }

    /// Write the artifact as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Identity,
    Logistic,
    Tanh,
}

/// Weighted sum of the inputs passed through a link function.
#[derive(Debug, Clone)]
pub struct LinearModel {
    inputs: Vec<String>,
    weights: Vec<f64>,
    bias: f64,
    link: Link,
}

impl LinearModel {
    fn from_file(file: ModelFile, link: Link) -> Result<Self> {
        if file.inputs.len() != file.weights.len() {
            return Err(Error::Config(format!(
                "model has {} inputs but {} weights",
                file.inputs.len(),
                file.weights.len()
            )));
        }
        Ok(Self { inputs: file.inputs, weights: file.weights, bias: file.bias, link })
    }
}

impl ScoringModel for LinearModel {
    fn input_names(&self) -> &[String] {
        &self.inputs
    }

    fn score(&self, inputs: &[f64]) -> f64 {
        let z = self.bias + self.weights.iter().zip(inputs).map(|(w, x)| w * x).sum::<f64>();
        match self.link {
            Link::Identity => z,
            Link::Logistic => 1.0 / (1.0 + (-z).exp()),
            Link::Tanh => z.tanh(),
        }
    }
}

type ModelCtor = fn(ModelFile) -> Result<Box<dyn ScoringModel>>;

fn build_linear(file: ModelFile) -> Result<Box<dyn ScoringModel>> {
    Ok(Box::new(LinearModel::from_file(file, Link::Identity)?))
}

fn build_logistic(file: ModelFile) -> Result<Box<dyn ScoringModel>> {
    Ok(Box::new(LinearModel::from_file(file, Link::Logistic)?))
}

fn build_tanh(file: ModelFile) -> Result<Box<dyn ScoringModel>> {
    Ok(Box::new(LinearModel::from_file(file, Link::Tanh)?))
}

/// Model constructors keyed by format name.
pub struct FormatRegistry {
    formats: BTreeMap<&'static str, ModelCtor>,
}

impl FormatRegistry {
    fn builtin() -> Self {
        let mut formats: BTreeMap<&'static str, ModelCtor> = BTreeMap::new();
        formats.insert("linear", build_linear);
        formats.insert("logistic", build_logistic);
        formats.insert("tanh", build_tanh);
        Self { formats }
    }

    /// Registered format names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.formats.keys().copied()
    }

    /// Build a model from an artifact.
    pub fn build(&self, file: ModelFile) -> Result<Box<dyn ScoringModel>> {
        let ctor = self.formats.get(file.format.as_str()).ok_or_else(|| {
            Error::Config(format!(
                "unknown model format '{}' (known: {})",
                file.format,
                self.names().collect::<Vec<_>>().join(", ")
            ))
        })?;
        ctor(file)
    }
}

static REGISTRY: OnceLock<FormatRegistry> = OnceLock::new();

/// The process-wide format registry, initialized on first use.
pub fn format_registry() -> &'static FormatRegistry {
    REGISTRY.get_or_init(|| {
        tracing::debug!("registering built-in model formats");
        FormatRegistry::builtin()
    })
}

struct BookedMethod {
    model: Box<dyn ScoringModel>,
    slots: Vec<usize>,
}

/// Holds input variables and booked models, and evaluates them per event.
#[derive(Default)]
pub struct ModelReader {
    variables: Vec<String>,
    values: Vec<f64>,
    spectators: Vec<String>,
    methods: BTreeMap<String, BookedMethod>,
}

impl ModelReader {
    /// Empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an input variable. Duplicates are ignored with a warning.
    pub fn add_variable(&mut self, name: &str) {
        if self.variables.iter().any(|v| v == name) {
            tracing::warn!(variable = name, "variable already registered");
            return;
        }
        self.variables.push(name.to_string());
        self.values.push(f64::NAN);
    }

    /// Register a spectator (carried, never fed to a model).
    pub fn add_spectator(&mut self, name: &str) {
        if self.spectators.iter().any(|v| v == name) {
            tracing::warn!(spectator = name, "spectator already registered");
            return;
        }
        self.spectators.push(name.to_string());
    }

    /// Registered variables.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Registered spectators.
    pub fn spectators(&self) -> &[String] {
        &self.spectators
    }

    /// Booked method names.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Load the artifact at `path` and book it under `name`.
    ///
    /// Every model input must already be a registered variable.
    pub fn book_method(&mut self, name: &str, path: &Path) -> Result<()> {
        if self.methods.contains_key(name) {
            return Err(Error::Config(format!("method '{name}' is already booked")));
        }
        let model = format_registry().build(ModelFile::load(path)?)?;
        let slots = model
            .input_names()
            .iter()
            .map(|input| {
                self.variables.iter().position(|v| v == input).ok_or_else(|| {
                    Error::Config(format!(
                        "model '{name}' needs input '{input}', which is not a registered variable"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        tracing::info!(method = name, path = %path.display(), inputs = slots.len(), "booked method");
        self.methods.insert(name.to_string(), BookedMethod { model, slots });
        Ok(())
    }

    /// Set the current value of a registered variable.
    pub fn set_variable(&mut self, name: &str, value: f64) -> Result<()> {
        let i = self
            .variables
            .iter()
            .position(|v| v == name)
            .ok_or_else(|| Error::Config(format!("variable '{name}' is not registered")))?;
        self.values[i] = value;
        Ok(())
    }

    fn booked(&self, name: &str) -> Result<&BookedMethod> {
        self.methods
            .get(name)
            .ok_or_else(|| Error::Config(format!("method '{name}' is not booked")))
    }

    /// Score of `name` at the current variable values.
    pub fn evaluate(&self, name: &str) -> Result<f64> {
        let booked = self.booked(name)?;
        let inputs: Vec<f64> = booked.slots.iter().map(|&i| self.values[i]).collect();
        Ok(booked.model.score(&inputs))
    }

    /// Score every row of `table` with `method`, adding the columns
    /// `<method>` (score) and `<method>_output` (1 if score > cut, else 0).
    ///
    /// Returns the number of passing rows.
    pub fn apply_to_table(&self, table: &mut EventTable, method: &str, cut: f64) -> Result<usize> {
        let booked = self.booked(method)?;
        for s in &self.spectators {
            table.column(s)?;
        }
        let columns = booked
            .model
            .input_names()
            .iter()
            .map(|name| table.f64_column(name))
            .collect::<mc_table::Result<Vec<_>>>()?;

        let mut row = vec![0.0; columns.len()];
        let scores: Vec<f64> = (0..table.n_rows())
            .map(|r| {
                for (slot, col) in row.iter_mut().zip(&columns) {
                    *slot = col[r];
                }
                booked.model.score(&row)
            })
            .collect();
        let output: Vec<f64> = scores.iter().map(|&s| if s > cut { 1.0 } else { 0.0 }).collect();
        let passed = output.iter().filter(|&&o| o > 0.0).count();

        table.push_column(method, Column::Float(scores))?;
        table.push_column(format!("{method}_output"), Column::Float(output))?;
        tracing::info!(method, cut, rows = table.n_rows(), passed, "applied method");
        Ok(passed)
    }
}
