//! # mc-table
//!
//! Event tables and their storage for mvacut.
//!
//! Provides the in-memory [`EventTable`], a small filter-expression language,
//! a Parquet-backed [`TableStore`] (one file per named table), CSV import and
//! export, the signal/background splitter, and the keyed upsert used for
//! result logs.
//!
//! ## Example
//!
//! ```no_run
//! use mc_table::{Expression, SplitSpec, load_events, split_events, write_split};
//! use std::path::Path;
//!
//! let events = load_events(Path::new("events.csv"), "events").unwrap();
//! let spec = SplitSpec::new(Expression::parse("(TrueNuPdg == 14 || TrueNuPdg == -14) && IsCC").unwrap())
//!     .with_exclusion(Expression::parse("CVNScoreNuE != -999").unwrap());
//! let split = split_events(&events, &spec).unwrap();
//! write_split(&split, Path::new("filtered")).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod csv_io;
pub mod error;
pub mod expr;
pub mod histogram;
pub mod source;
pub mod split;
pub mod store;
pub mod table;
pub mod upsert;

pub use csv_io::{read_csv, write_csv};
pub use error::{Result, TableError};
pub use expr::Expression;
pub use histogram::Histogram1D;
pub use source::load_events;
pub use split::{
    BACKGROUND_TABLE, DEFAULT_EXCLUSION, InteractionType, SIGNAL_TABLE, SplitOutcome, SplitSpec,
    SplitSummary, define_cvn_max, split_events, write_split,
};
pub use store::{TableStore, WriteMode, read_parquet_file, write_parquet_file};
pub use table::{Column, EventTable};
pub use upsert::{DEFAULT_KEY_COLUMN, UpsertOutcome, lookup_by_key, upsert_by_key};
