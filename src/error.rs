//! Error types for decoding positional status lines.

/// Failure to decode a fixed-position field from a `/proc/<pid>/stat` line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatError {
    #[error("stat line has {found} fields, expected at least {expected}")]
    TooFewFields { expected: usize, found: usize },

    #[error("stat field {name} is not numeric: {value:?}")]
    InvalidField { name: &'static str, value: String },

    #[error("stat line is empty")]
    Empty,
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, StatError>;
