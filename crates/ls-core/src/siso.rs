//! The single-input/single-output block contract.
//!
//! Every generator, plant and regulator in a loop is driven through
//! [`SisoBlock`]. A block never reads a clock of its own: simulated time is
//! always passed in by the caller.

use core::fmt;

use crate::{CoreResult, Real};

/// Recoverable per-step events a block can raise without failing the step.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum Condition {
    /// The control law was ill-conditioned; the previous command was held.
    ControlComputationDegenerate { reason: String },
    /// The identifier skipped its update; the model estimate is unchanged.
    IdentificationStalled { reason: String },
}

impl Condition {
    pub fn kind(&self) -> &'static str {
        match self {
            Condition::ControlComputationDegenerate { .. } => "ControlComputationDegenerate",
            Condition::IdentificationStalled { .. } => "IdentificationStalled",
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Condition::ControlComputationDegenerate { reason }
            | Condition::IdentificationStalled { reason } => reason,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.reason())
    }
}

/// One scalar in, one scalar out, once per step.
pub trait SisoBlock {
    /// Return every piece of internal state to its initial conditions.
    fn reset(&mut self);

    /// Advance one state transition.
    ///
    /// Output depends only on the current state and the arguments. An `Err`
    /// is fatal for the run; recoverable events go through [`Self::conditions`].
    fn step(&mut self, input: Real, t: Real) -> CoreResult<Real>;

    /// Conditions raised by the most recent `step`.
    fn conditions(&self) -> &[Condition] {
        &[]
    }
}

impl<B: SisoBlock + ?Sized> SisoBlock for Box<B> {
    fn reset(&mut self) {
        (**self).reset()
    }

    fn step(&mut self, input: Real, t: Real) -> CoreResult<Real> {
        (**self).step(input, t)
    }

    fn conditions(&self) -> &[Condition] {
        (**self).conditions()
    }
}

/// Drive `block` from a fresh reset over `inputs`, one step per `period`.
pub fn replay<B: SisoBlock + ?Sized>(
    block: &mut B,
    inputs: &[Real],
    t0: Real,
    period: Real,
) -> CoreResult<Vec<Real>> {
    block.reset();
    inputs
        .iter()
        .enumerate()
        .map(|(k, &u)| block.step(u, t0 + k as Real * period))
        .collect()
}
