//! Simulation loop for SISO control systems.
//!
//! Provides:
//! - `SimulationLoop`: the `Idle → Running → Completed | Aborted` state machine
//!   that steps generators, regulator and plant in a fixed order per tick
//! - `AbortHandle`: cross-thread cancellation, checked once per tick
//! - `compile_loop`: builds a loop from a validated `LoopDef`
//! - `run_batch`: independent loops in parallel, one per rayon task

pub mod abort;
pub mod batch;
pub mod compile;
pub mod error;
pub mod progress;
pub mod sim_loop;

pub use abort::AbortHandle;
pub use batch::{KERNEL_VERSION, RunOutcome, run_batch, run_definition};
pub use compile::{build_plant, compile_loop};
pub use error::{SimError, SimResult};
pub use progress::TickProgress;
pub use sim_loop::{
    CHANNEL_ERROR, CHANNEL_GENERATOR, CHANNEL_PLANT, CHANNEL_REGULATOR, LoopBuilder, LoopState,
    SimulationLoop,
};
