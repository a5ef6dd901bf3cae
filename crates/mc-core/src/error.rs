//! Error types for mvacut

use thiserror::Error;

/// mvacut error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid or inaccessible configuration (input paths, bin edges, bin counts).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or unusable data (tables, columns, empty samples).
    #[error("Data error: {0}")]
    Data(String),

    /// Numerical procedure failed.
    #[error("Computation error: {0}")]
    Computation(String),
}

impl Error {
    /// `true` for errors raised before any computation starts.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_category() {
        let e = Error::Config("bin edges must have at least 2 entries".into());
        assert!(e.is_config());
        assert_eq!(e.to_string(), "Configuration error: bin edges must have at least 2 entries");

        let e = Error::Data("table 'Signal' not found".into());
        assert!(!e.is_config());
        assert!(e.to_string().starts_with("Data error"));
    }
}
