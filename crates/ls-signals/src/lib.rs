//! Signal generators for loopsim.
//!
//! Generators are input-independent SISO blocks producing setpoint and
//! disturbance signals from a parametric waveform. They are built from a type
//! tag and a [`GeneratorParams`] set by [`create_generator`].

pub mod error;
pub mod factory;
pub mod generator;

pub use error::{SignalError, SignalResult};
pub use factory::{GeneratorKind, GeneratorParams, create_generator};
pub use generator::{Generator, NoiseDistribution, Waveform};
