//! ls-results: run historian and run identity.

pub mod hash;
pub mod historian;
pub mod types;

pub use hash::compute_run_id;
pub use historian::{Historian, Window};
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ResultsError {
    #[error("Non-monotonic timestamp on '{channel}': {time_s} after {last_s}")]
    NonMonotonicTimestamp {
        channel: String,
        time_s: f64,
        last_s: f64,
    },

    #[error("Non-finite timestamp on '{channel}': {time_s}")]
    NonFiniteTimestamp { channel: String, time_s: f64 },

    #[error("Unknown channel: {channel}")]
    UnknownChannel { channel: String },
}
