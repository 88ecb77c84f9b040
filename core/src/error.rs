//! Error types for the index builder

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Store unreachable after the bounded connection policy. Fatal.
    #[error("could not connect to the store after {attempts} attempts")]
    Connection { attempts: usize },

    /// A single row write failed; the row is lost, the run continues.
    #[error("write to {table} failed: {reason}")]
    Persistence { table: &'static str, reason: String },

    #[error("store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Why an input line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("expected {expected} tab-separated fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("empty {0} field")]
    EmptyField(&'static str),

    #[error("count {0:?} is not an integer")]
    InvalidCount(String),

    #[error("count must be at least 1")]
    ZeroCount,

    #[error("line is not valid UTF-8")]
    Encoding,
}

impl RecordError {
    /// Short stable label, used to tally skips by reason.
    pub fn kind(&self) -> &'static str {
        match self {
            RecordError::FieldCount { .. } => "field_count",
            RecordError::EmptyField(_) => "empty_field",
            RecordError::InvalidCount(_) => "invalid_count",
            RecordError::ZeroCount => "zero_count",
            RecordError::Encoding => "encoding",
        }
    }
}

impl From<sled::Error> for Error {
    fn from(e: sled::Error) -> Self {
        Error::Store(e.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Store(format!("encoding: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
