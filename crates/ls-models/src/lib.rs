//! Discrete-time plant models for loopsim.
//!
//! Provides:
//! - ARX coefficient sets shared by plants, identifiers and predictive control
//! - Fixed-order difference-equation plants (`DiscreteModel`)
//! - Transfer-function construction in powers of z^-1
//! - Series/parallel plant composition

pub mod arx;
pub mod error;
pub mod model;
pub mod plant;

pub use arx::ArxCoefficients;
pub use error::{ModelError, ModelResult};
pub use model::DiscreteModel;
pub use plant::{Plant, create_sim_object};
