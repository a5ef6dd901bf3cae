//! Naming of trained methods and their weight artifacts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A classifier booked for training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodConfig {
    /// Classifier family (`BDT`, `MLP`, ...).
    pub kind: String,
    /// Method name.
    pub name: String,
    /// Free-form training options.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl MethodConfig {
    /// New method with no options.
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self { kind: kind.into(), name: name.into(), options: BTreeMap::new() }
    }

    /// Add one option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// `<name>_<suffix>`, or the bare name for an empty suffix.
    pub fn unique_name(&self, suffix: &str) -> String {
        if suffix.is_empty() { self.name.clone() } else { format!("{}_{suffix}", self.name) }
    }

    /// Options rendered as `key=value` joined by `:`.
    pub fn option_string(&self) -> String {
        self.options.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(":")
    }
}

/// `<out_dir>/models/weights/<job>_<unique>.weights.json`.
pub fn weights_path(out_dir: &Path, job: &str, unique: &str) -> PathBuf {
    out_dir.join("models").join("weights").join(format!("{job}_{unique}.weights.json"))
}
