//! Error types for generator construction.

use thiserror::Error;

/// Result type for generator operations.
pub type SignalResult<T> = Result<T, SignalError>;

/// Errors raised while building a generator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SignalError {
    /// The factory does not know the requested type tag.
    #[error("Unknown generator type: '{tag}'")]
    UnknownGeneratorType { tag: String },

    /// A waveform parameter is out of range.
    #[error("Invalid parameter: {what}")]
    InvalidParameter { what: String },
}

impl SignalError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        SignalError::InvalidParameter { what: what.into() }
    }
}
