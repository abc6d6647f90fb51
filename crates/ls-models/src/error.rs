//! Error types for plant model construction.

use ls_core::CoreError;
use thiserror::Error;

/// Errors raised while building or reconfiguring a plant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid parameter: {what}")]
    InvalidParameter { what: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type ModelResult<T> = Result<T, ModelError>;

impl ModelError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        ModelError::InvalidParameter { what: what.into() }
    }
}
