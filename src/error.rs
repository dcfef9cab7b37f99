//! Error types for the transform phase.

use thiserror::Error;

/// Errors raised while reading, aggregating, or writing rows.
#[derive(Error, Debug)]
pub enum EtlError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A retained row whose id or value fields could not be parsed
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
}

impl EtlError {
    pub(crate) fn malformed(line: u64, reason: impl Into<String>) -> Self {
        EtlError::MalformedRow {
            line,
            reason: reason.into(),
        }
    }
}
