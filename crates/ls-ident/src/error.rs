//! Error types for identifier construction.

use ls_models::ModelError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdentError {
    #[error("Invalid parameter: {what}")]
    InvalidParameter { what: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type IdentResult<T> = Result<T, IdentError>;
