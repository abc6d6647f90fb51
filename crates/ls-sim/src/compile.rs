//! Loop definition → runnable loop.

use ls_controls::create_regulator;
use ls_models::{ArxCoefficients, DiscreteModel, Plant};
use ls_project::{LoopDef, PlantModelDef, validate_loop};
use ls_signals::create_generator;

use crate::error::SimResult;
use crate::sim_loop::SimulationLoop;

/// Validate `def` and build its blocks. Construction errors surface here,
/// before any tick runs.
pub fn compile_loop(def: &LoopDef) -> SimResult<SimulationLoop> {
    validate_loop(def)?;

    let mut builder = SimulationLoop::builder(&def.name, def.period_s, def.steps);
    for generator in &def.generators {
        builder = builder.generator(
            &generator.name,
            create_generator(&generator.kind, &generator.params)?,
        );
    }
    builder = builder.regulator(
        &def.regulator.name,
        create_regulator(&def.regulator.spec, def.period_s)?,
    );
    builder = builder.plant(&def.plant.name, build_plant(&def.plant.model, def.period_s)?);
    builder.build()
}

/// Build a plant tree sampled every `period_s`.
pub fn build_plant(model: &PlantModelDef, period_s: f64) -> SimResult<Plant> {
    Ok(match model {
        PlantModelDef::Arx {
            a,
            b,
            delay,
            initial_inputs,
            initial_outputs,
        } => {
            let coeffs = ArxCoefficients::new(a.clone(), b.clone(), *delay)?;
            let mut m = DiscreteModel::new(a.len(), coeffs, period_s)?;
            if !initial_inputs.is_empty() || !initial_outputs.is_empty() {
                m.seed_history(initial_inputs, initial_outputs)?;
            }
            Plant::Model(m)
        }
        PlantModelDef::TransferFunction {
            numerator,
            denominator,
            delay,
        } => Plant::Model(DiscreteModel::from_transfer_function(
            numerator,
            denominator,
            *delay,
            period_s,
        )?),
        PlantModelDef::Series { stages } => Plant::series(
            stages
                .iter()
                .map(|s| build_plant(s, period_s))
                .collect::<SimResult<Vec<_>>>()?,
        )?,
        PlantModelDef::Parallel { branches } => Plant::parallel(
            branches
                .iter()
                .map(|b| build_plant(b, period_s))
                .collect::<SimResult<Vec<_>>>()?,
        )?,
    })
}
