//! Parallel execution of independent loop definitions.

use rayon::prelude::*;

use ls_project::LoopDef;
use ls_results::{Historian, RunManifest};

use crate::compile::compile_loop;
use crate::error::SimResult;
use crate::sim_loop::LoopState;

/// Version string mixed into every run id.
pub const KERNEL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything a finished run leaves behind.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub manifest: RunManifest,
    pub state: LoopState,
    pub historian: Historian,
}

/// Compile and run one definition to completion (or abort).
pub fn run_definition(def: &LoopDef) -> SimResult<RunOutcome> {
    let manifest = RunManifest::new(def, KERNEL_VERSION);
    let mut sim = compile_loop(def)?;
    tracing::debug!("run {} for loop '{}'", manifest.run_id, def.name);
    let state = sim.run()?;
    Ok(RunOutcome {
        manifest,
        state,
        historian: sim.into_historian(),
    })
}

/// Run every definition on its own rayon task. Each task owns its blocks and
/// historian; results come back in input order.
pub fn run_batch(defs: &[LoopDef]) -> Vec<SimResult<RunOutcome>> {
    tracing::info!("running batch of {} loop(s)", defs.len());
    defs.par_iter().map(run_definition).collect()
}
