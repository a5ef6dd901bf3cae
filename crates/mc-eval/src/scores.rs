//! Score columns of the two classes.

use mc_core::Result;
use mc_table::{BACKGROUND_TABLE, SIGNAL_TABLE, TableStore};

/// Scores of one method for signal and background events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassScores {
    /// Signal scores.
    pub signal: Vec<f64>,
    /// Background scores.
    pub background: Vec<f64>,
}

impl ClassScores {
    /// Read `column` from the `Signal` and `Background` tables of a store.
    pub fn from_store(store: &TableStore, column: &str) -> Result<Self> {
        let signal = store.read_table(SIGNAL_TABLE)?;
        let background = store.read_table(BACKGROUND_TABLE)?;
        Ok(Self {
            signal: signal.f64_column(column)?.to_vec(),
            background: background.f64_column(column)?.to_vec(),
        })
    }
}
