//! Error types raised by the loader, the metric engine and the session.

use crate::core::record::Period;
use thiserror::Error;

/// Failure to turn a source into a record set. The whole load is aborted; no
/// partial record set is ever returned alongside one of these.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dataset has no header row")]
    EmptyHeader,

    #[error("Dataset header could not be decoded: {0}")]
    InvalidHeader(String),

    #[error("Delimiter '{0}' is not a single ASCII character")]
    InvalidDelimiter(char),

    #[error("Dataset is missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error("Cannot compute {metric}: the dataset is empty")]
    EmptyDataset { metric: &'static str },

    #[error("Cannot compute {metric}: the {period} total does not fit in 64 bits")]
    Overflow { metric: &'static str, period: Period },
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No dataset has been loaded in this session")]
    NothingLoaded,

    #[error(transparent)]
    Load(#[from] LoadError),
}
