//! Error types for regulator construction.

use ls_core::CoreError;
use ls_ident::IdentError;
use ls_models::ModelError;
use thiserror::Error;

/// Result type for regulator operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur while building a regulator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid tuning or structure parameter.
    #[error("Invalid parameter: {what}")]
    InvalidParameter { what: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Identifier: {0}")]
    Ident(#[from] IdentError),

    #[error("Model: {0}")]
    Model(#[from] ModelError),
}

impl ControlError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        ControlError::InvalidParameter { what: what.into() }
    }
}
