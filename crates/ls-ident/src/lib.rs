//! Online ARX model identification by recursive least squares.
//!
//! The identifier consumes one `(u[k-1], y[k])` pair per step and refines its
//! coefficient estimate. Steps that carry no usable information are skipped
//! and reported as stalled instead of being allowed to corrupt the covariance.

pub mod error;
pub mod rls;

pub use error::{IdentError, IdentResult};
pub use rls::{ArxIdentifier, IdentifierConfig, UpdateOutcome};
