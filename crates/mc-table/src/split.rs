//! Signal/background dataset splitting.
//!
//! Rows failing the exclusion filter are dropped. The remaining rows go to
//! `Signal` when the signal expression holds and to `Background` otherwise,
//! so every surviving row lands in exactly one partition.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};
use crate::expr::Expression;
use crate::store::{TableStore, WriteMode};
use crate::table::{Column, EventTable};

/// Table name of the signal partition.
pub const SIGNAL_TABLE: &str = "Signal";
/// Table name of the background partition.
pub const BACKGROUND_TABLE: &str = "Background";

/// Exclusion filter used by the interaction presets: drops events without a
/// CVN evaluation.
pub const DEFAULT_EXCLUSION: &str = "CVNScoreNuE != -999";

/// Neutrino interaction class used to pick a signal definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionType {
    /// Charged-current electron (anti)neutrino.
    #[serde(rename = "nue", alias = "NuE")]
    NuE,
    /// Charged-current muon (anti)neutrino.
    #[serde(rename = "numu", alias = "NuMu")]
    NuMu,
    /// Neutral current.
    #[serde(rename = "nc", alias = "NC")]
    NC,
}

impl InteractionType {
    /// All classes, in CVN score column order.
    pub const ALL: [InteractionType; 3] =
        [InteractionType::NuE, InteractionType::NuMu, InteractionType::NC];

    /// Short label (`NuE`, `NuMu`, `NC`).
    pub fn label(self) -> &'static str {
        match self {
            InteractionType::NuE => "NuE",
            InteractionType::NuMu => "NuMu",
            InteractionType::NC => "NC",
        }
    }

    /// Signal expression for this class.
    pub fn signal_source(self) -> &'static str {
        match self {
            InteractionType::NuE => "(TrueNuPdg == 12 || TrueNuPdg == -12) && IsCC",
            InteractionType::NuMu => "(TrueNuPdg == 14 || TrueNuPdg == -14) && IsCC",
            InteractionType::NC => "!IsCC",
        }
    }

    /// Parsed signal expression.
    pub fn signal_expression(self) -> Result<Expression> {
        Expression::parse(self.signal_source())
    }

    /// CVN score column for this class.
    pub fn cvn_score_column(self) -> String {
        format!("CVNScore{}", self.label())
    }

    /// Name of the derived "CVN picks this class" column.
    pub fn cvn_max_column(self) -> String {
        format!("CVNMax_{}", self.label())
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InteractionType {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nue" => Ok(InteractionType::NuE),
            "numu" => Ok(InteractionType::NuMu),
            "nc" => Ok(InteractionType::NC),
            _ => Err(TableError::Invalid(format!(
                "unknown interaction type '{s}' (expected nue, numu or nc)"
            ))),
        }
    }
}

/// Add `CVNMax_<type>`: 1 when `signal` has the largest of the three CVN
/// scores, else 0. Ties resolve in the order NuMu, NuE, NC.
pub fn define_cvn_max(events: &mut EventTable, signal: InteractionType) -> Result<String> {
    let nue = events.f64_column(&InteractionType::NuE.cvn_score_column())?;
    let numu = events.f64_column(&InteractionType::NuMu.cvn_score_column())?;
    let nc = events.f64_column(&InteractionType::NC.cvn_score_column())?;

    let values: Vec<f64> = (0..events.n_rows())
        .map(|i| {
            let mut predicted = InteractionType::NuMu;
            let mut best = numu[i];
            if nue[i] > best {
                best = nue[i];
                predicted = InteractionType::NuE;
            }
            if nc[i] > best {
                predicted = InteractionType::NC;
            }
            if predicted == signal { 1.0 } else { 0.0 }
        })
        .collect();

    let name = signal.cvn_max_column();
    events.push_column(name.clone(), Column::Float(values))?;
    Ok(name)
}

/// Splitting rules.
#[derive(Debug, Clone)]
pub struct SplitSpec {
    /// Rows satisfying this go to `Signal`.
    pub signal: Expression,
    /// Rows failing this are dropped before classification.
    pub exclusion: Expression,
    /// Columns kept in the output. Empty keeps every column.
    pub keep: Vec<String>,
}

impl SplitSpec {
    /// Split on `signal` with no exclusion and no projection.
    pub fn new(signal: Expression) -> Self {
        Self { signal, exclusion: Expression::always(), keep: Vec::new() }
    }

    /// Preset for an interaction class, with the default CVN exclusion.
    pub fn preset(kind: InteractionType) -> Result<Self> {
        Ok(Self {
            signal: kind.signal_expression()?,
            exclusion: Expression::parse(DEFAULT_EXCLUSION)?,
            keep: Vec::new(),
        })
    }

    /// Replace the exclusion filter.
    pub fn with_exclusion(mut self, exclusion: Expression) -> Self {
        self.exclusion = exclusion;
        self
    }

    /// Set the output projection.
    pub fn with_keep(mut self, keep: Vec<String>) -> Self {
        self.keep = keep;
        self
    }
}

/// Row accounting for one split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitSummary {
    /// Rows read.
    pub input_rows: usize,
    /// Rows removed by the exclusion filter.
    pub excluded_rows: usize,
    /// `excluded_rows / input_rows` (0 for empty input).
    pub excluded_fraction: f64,
    /// Rows in `Signal`.
    pub signal_rows: usize,
    /// Rows in `Background`.
    pub background_rows: usize,
}

/// Result of [`split_events`].
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    /// Signal partition, named [`SIGNAL_TABLE`].
    pub signal: EventTable,
    /// Background partition, named [`BACKGROUND_TABLE`].
    pub background: EventTable,
    /// Row accounting.
    pub summary: SplitSummary,
}

/// Partition `events` into signal and background.
pub fn split_events(events: &EventTable, spec: &SplitSpec) -> Result<SplitOutcome> {
    let input_rows = events.n_rows();
    tracing::info!(exclusion = %spec.exclusion, "applying exclusion filter");
    let kept = events.filter(&spec.exclusion)?;
    let excluded_rows = input_rows - kept.n_rows();

    tracing::info!(signal = %spec.signal, "splitting on signal expression");
    let is_signal = kept.mask(&spec.signal)?;
    let is_background: Vec<bool> = is_signal.iter().map(|s| !s).collect();

    let project = |t: EventTable| -> Result<EventTable> {
        if spec.keep.is_empty() { Ok(t) } else { t.project(&spec.keep) }
    };
    let signal = project(kept.filter_mask(&is_signal)?)?.renamed(SIGNAL_TABLE);
    let background = project(kept.filter_mask(&is_background)?)?.renamed(BACKGROUND_TABLE);

    let summary = SplitSummary {
        input_rows,
        excluded_rows,
        excluded_fraction: if input_rows == 0 {
            0.0
        } else {
            excluded_rows as f64 / input_rows as f64
        },
        signal_rows: signal.n_rows(),
        background_rows: background.n_rows(),
    };
    tracing::info!(
        input = summary.input_rows,
        excluded = summary.excluded_rows,
        excluded_fraction = summary.excluded_fraction,
        signal = summary.signal_rows,
        background = summary.background_rows,
        "split events"
    );
    Ok(SplitOutcome { signal, background, summary })
}

/// Write a split to a store: `Signal` recreates the store, then
/// `Background` is added alongside it.
pub fn write_split(outcome: &SplitOutcome, out: &Path) -> Result<TableStore> {
    tracing::info!(output = %out.display(), "writing Signal table");
    TableStore::create(out, WriteMode::Recreate)?.write_table(&outcome.signal)?;

    tracing::info!(output = %out.display(), "adding Background table");
    let store = TableStore::create(out, WriteMode::Update)?;
    store.write_table(&outcome.background)?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cvn_events() -> EventTable {
        EventTable::from_columns(
            "events",
            [
                ("CVNScoreNuE".to_string(), Column::Float(vec![0.7, 0.1, 0.2, 0.3])),
                ("CVNScoreNuMu".to_string(), Column::Float(vec![0.2, 0.8, 0.2, 0.3])),
                ("CVNScoreNC".to_string(), Column::Float(vec![0.1, 0.1, 0.6, 0.3])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn cvn_max_picks_largest_score() {
        let mut t = cvn_events();
        let name = define_cvn_max(&mut t, InteractionType::NuMu).unwrap();
        assert_eq!(name, "CVNMax_NuMu");
        // Last row is a three-way tie, which resolves to NuMu.
        assert_eq!(t.f64_column(&name).unwrap(), &[0.0, 1.0, 0.0, 1.0]);

        define_cvn_max(&mut t, InteractionType::NC).unwrap();
        assert_eq!(t.f64_column("CVNMax_NC").unwrap(), &[0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn interaction_type_parsing() {
        assert_eq!("NuMu".parse::<InteractionType>().unwrap(), InteractionType::NuMu);
        assert_eq!("nc".parse::<InteractionType>().unwrap(), InteractionType::NC);
        assert!("nutau".parse::<InteractionType>().is_err());
        let t: InteractionType = serde_json::from_str("\"nue\"").unwrap();
        assert_eq!(t, InteractionType::NuE);
        for kind in InteractionType::ALL {
            assert!(kind.signal_expression().is_ok());
        }
    }

    #[test]
    fn empty_input_has_zero_fraction() {
        let t = EventTable::from_columns("e", [("x".to_string(), Column::Float(vec![]))]).unwrap();
        let spec = SplitSpec::new(Expression::parse("x > 0").unwrap());
        let out = split_events(&t, &spec).unwrap();
        assert_eq!(out.summary.excluded_fraction, 0.0);
        assert_eq!(out.signal.n_rows() + out.background.n_rows(), 0);
    }
}
