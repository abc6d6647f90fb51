use thiserror::Error;

use crate::ids::Id;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid parameter: {what}")]
    InvalidParameter { what: String },

    #[error("Name collision: '{name}' is already registered")]
    NameCollision { name: String },

    #[error("Unknown id: {id}")]
    UnknownId { id: Id },

    #[error("Id space exhausted")]
    IdExhausted,
}

impl CoreError {
    pub fn invalid(what: impl Into<String>) -> Self {
        CoreError::InvalidParameter { what: what.into() }
    }
}
