//! Plant composition.
//!
//! A plant is either a single difference-equation model or a tree of plants
//! wired in series (each stage feeds the next) or in parallel (shared input,
//! summed outputs).

use ls_core::{CoreResult, Real, SisoBlock};

use crate::arx::ArxCoefficients;
use crate::error::{ModelError, ModelResult};
use crate::model::DiscreteModel;

#[derive(Debug, Clone)]
pub enum Plant {
    Model(DiscreteModel),
    Series(Vec<Plant>),
    Parallel(Vec<Plant>),
}

impl Plant {
    pub fn series(stages: Vec<Plant>) -> ModelResult<Self> {
        check_stages(&stages)?;
        Ok(Plant::Series(stages))
    }

    pub fn parallel(branches: Vec<Plant>) -> ModelResult<Self> {
        check_stages(&branches)?;
        Ok(Plant::Parallel(branches))
    }

    /// Sampling period shared by every model in the tree.
    pub fn sampling_period(&self) -> Real {
        match self {
            Plant::Model(m) => m.sampling_period(),
            Plant::Series(stages) | Plant::Parallel(stages) => {
                stages.first().map_or(0.0, Plant::sampling_period)
            }
        }
    }

    /// Number of leaf models.
    pub fn model_count(&self) -> usize {
        match self {
            Plant::Model(_) => 1,
            Plant::Series(stages) | Plant::Parallel(stages) => {
                stages.iter().map(Plant::model_count).sum()
            }
        }
    }
}

impl From<DiscreteModel> for Plant {
    fn from(model: DiscreteModel) -> Self {
        Plant::Model(model)
    }
}

impl SisoBlock for Plant {
    fn reset(&mut self) {
        match self {
            Plant::Model(m) => m.reset(),
            Plant::Series(stages) | Plant::Parallel(stages) => {
                stages.iter_mut().for_each(|s| s.reset())
            }
        }
    }

    fn step(&mut self, input: Real, t: Real) -> CoreResult<Real> {
        match self {
            Plant::Model(m) => m.step(input, t),
            Plant::Series(stages) => stages
                .iter_mut()
                .try_fold(input, |signal, stage| stage.step(signal, t)),
            Plant::Parallel(branches) => branches
                .iter_mut()
                .try_fold(0.0, |sum, branch| branch.step(input, t).map(|y| sum + y)),
        }
    }
}

/// Construct a single-model plant of the given order.
pub fn create_sim_object(
    order: usize,
    coefficients: ArxCoefficients,
    sampling_period: Real,
) -> ModelResult<Plant> {
    Ok(Plant::Model(DiscreteModel::new(order, coefficients, sampling_period)?))
}

fn check_stages(stages: &[Plant]) -> ModelResult<()> {
    let first = stages
        .first()
        .ok_or_else(|| ModelError::invalid("composite plant needs at least one stage"))?;
    let period = first.sampling_period();
    if let Some(other) = stages.iter().find(|s| s.sampling_period() != period) {
        return Err(ModelError::invalid(format!(
            "all stages must share one sampling period ({period} vs {})",
            other.sampling_period()
        )));
    }
    Ok(())
}
