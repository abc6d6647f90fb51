//! Error types for loop construction and driving.

use thiserror::Error;

/// Errors raised while building or driving a loop.
///
/// Faults inside a running tick do not surface here: they move the loop to
/// `Aborted` and are reported through its state.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid parameter: {what}")]
    InvalidParameter { what: String },

    #[error("Loop is {state}; {action} needs {expected}")]
    InvalidState {
        state: String,
        action: &'static str,
        expected: &'static str,
    },

    #[error("Block '{block}' failed: {source}")]
    BlockFailed {
        block: String,
        source: ls_core::CoreError,
    },

    #[error(transparent)]
    Core(#[from] ls_core::CoreError),

    #[error("Generator: {0}")]
    Signal(#[from] ls_signals::SignalError),

    #[error("Plant: {0}")]
    Model(#[from] ls_models::ModelError),

    #[error("Regulator: {0}")]
    Control(#[from] ls_controls::ControlError),

    #[error("Historian: {0}")]
    Results(#[from] ls_results::ResultsError),

    #[error("Definition: {0}")]
    Project(#[from] ls_project::ProjectError),
}

pub type SimResult<T> = Result<T, SimError>;

impl From<ls_project::ValidationError> for SimError {
    fn from(e: ls_project::ValidationError) -> Self {
        SimError::Project(e.into())
    }
}
