//! The simulation loop state machine.
//!
//! Per tick, in this order:
//! 1. check the abort flag
//! 2. sample every generator and sum them into the setpoint `r[k]`
//! 3. hand `r[k]` (plus the preview a predictive regulator asks for) to the
//!    regulator and step it with the plant output of the previous tick
//! 4. step the plant with the regulator output of this tick
//! 5. record `generator`, `regulator`, `plant` and `error` at `t = k·period`
//!
//! A failing block moves the loop to `Aborted`; everything recorded by the
//! ticks before it stays in the historian.

use std::fmt;

use ls_controls::Regulator;
use ls_core::{
    Condition, Entity, Real, Registry, SisoBlock, Tolerances, ensure_finite, nearly_equal,
};
use ls_models::Plant;
use ls_results::Historian;
use ls_signals::Generator;

use crate::abort::AbortHandle;
use crate::error::{SimError, SimResult};
use crate::progress::TickProgress;

pub const CHANNEL_GENERATOR: &str = "generator";
pub const CHANNEL_REGULATOR: &str = "regulator";
pub const CHANNEL_PLANT: &str = "plant";
pub const CHANNEL_ERROR: &str = "error";

#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    Idle,
    Running,
    Completed,
    Aborted { reason: String },
}

impl LoopState {
    pub fn is_finished(&self) -> bool {
        matches!(self, LoopState::Completed | LoopState::Aborted { .. })
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopState::Idle => write!(f, "idle"),
            LoopState::Running => write!(f, "running"),
            LoopState::Completed => write!(f, "completed"),
            LoopState::Aborted { reason } => write!(f, "aborted ({reason})"),
        }
    }
}

/// Collects the blocks of a loop; [`LoopBuilder::build`] checks them.
pub struct LoopBuilder {
    name: String,
    period_s: Real,
    steps: usize,
    generators: Vec<(String, Generator)>,
    regulator: Option<(String, Regulator)>,
    plant: Option<(String, Plant)>,
}

impl LoopBuilder {
    pub fn generator(mut self, name: impl Into<String>, generator: Generator) -> Self {
        self.generators.push((name.into(), generator));
        self
    }

    pub fn regulator(mut self, name: impl Into<String>, regulator: Regulator) -> Self {
        self.regulator = Some((name.into(), regulator));
        self
    }

    pub fn plant(mut self, name: impl Into<String>, plant: Plant) -> Self {
        self.plant = Some((name.into(), plant));
        self
    }

    pub fn build(self) -> SimResult<SimulationLoop> {
        ls_core::ensure_positive(self.period_s, "loop period")?;
        let (regulator_name, regulator) = self.regulator.ok_or_else(|| SimError::InvalidParameter {
            what: format!("loop '{}' has no regulator", self.name),
        })?;
        let (plant_name, plant) = self.plant.ok_or_else(|| SimError::InvalidParameter {
            what: format!("loop '{}' has no plant", self.name),
        })?;

        let tol = Tolerances::default();
        for (block, period) in [
            (&regulator_name, regulator.sampling_period()),
            (&plant_name, plant.sampling_period()),
        ] {
            if !nearly_equal(period, self.period_s, tol) {
                return Err(SimError::InvalidParameter {
                    what: format!(
                        "block '{block}' samples every {period} s but the loop runs every {} s",
                        self.period_s
                    ),
                });
            }
        }

        let mut registry = Registry::new();
        let mut generators = Vec::with_capacity(self.generators.len());
        for (name, generator) in self.generators {
            generators.push((registry.register_unique_name(&name)?, generator));
        }
        let regulator = (registry.register_unique_name(&regulator_name)?, regulator);
        let plant = (registry.register_unique_name(&plant_name)?, plant);

        Ok(SimulationLoop {
            name: self.name,
            period_s: self.period_s,
            steps: self.steps,
            registry,
            generators,
            regulator,
            plant,
            historian: Historian::new(),
            state: LoopState::Idle,
            step: 0,
            measured: 0.0,
            abort: AbortHandle::new(),
        })
    }
}

/// One SISO loop: summed generators → regulator → plant, with the plant
/// output fed back as the regulator's measurement on the next tick.
pub struct SimulationLoop {
    name: String,
    period_s: Real,
    steps: usize,
    registry: Registry,
    generators: Vec<(Entity, Generator)>,
    regulator: (Entity, Regulator),
    plant: (Entity, Plant),
    historian: Historian,
    state: LoopState,
    step: usize,
    measured: Real,
    abort: AbortHandle,
}

impl SimulationLoop {
    pub fn builder(name: impl Into<String>, period_s: Real, steps: usize) -> LoopBuilder {
        LoopBuilder {
            name: name.into(),
            period_s,
            steps,
            generators: Vec::new(),
            regulator: None,
            plant: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn period_s(&self) -> Real {
        self.period_s
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Ticks executed since the last reset.
    pub fn step_index(&self) -> usize {
        self.step
    }

    /// Time of the next tick.
    pub fn sim_time_s(&self) -> Real {
        self.step as Real * self.period_s
    }

    pub fn historian(&self) -> &Historian {
        &self.historian
    }

    pub fn into_historian(self) -> Historian {
        self.historian
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn regulator(&self) -> &Regulator {
        &self.regulator.1
    }

    pub fn plant(&self) -> &Plant {
        &self.plant.1
    }

    /// A handle that stops this loop at the start of its next tick.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Change the step count before the run starts.
    pub fn set_steps(&mut self, steps: usize) -> SimResult<()> {
        if self.state != LoopState::Idle {
            return Err(self.wrong_state("set_steps", "idle"));
        }
        self.steps = steps;
        Ok(())
    }

    /// Execute one tick.
    pub fn tick(&mut self) -> SimResult<&LoopState> {
        match self.state {
            LoopState::Idle => self.start(),
            LoopState::Running => {}
            LoopState::Completed | LoopState::Aborted { .. } => {
                return Err(self.wrong_state("tick", "idle or running"));
            }
        }

        if self.abort.is_aborted() {
            self.finish_aborted("abort requested".to_string());
            return Ok(&self.state);
        }
        if self.step >= self.steps {
            self.finish_completed();
            return Ok(&self.state);
        }

        if let Err(e) = self.advance() {
            self.finish_aborted(e.to_string());
            return Ok(&self.state);
        }

        if self.step >= self.steps {
            self.finish_completed();
        }
        Ok(&self.state)
    }

    /// Tick until the loop completes or aborts.
    pub fn run(&mut self) -> SimResult<LoopState> {
        self.run_with_progress(|_| {})
    }

    /// Like [`Self::run`], reporting after every tick.
    pub fn run_with_progress<F>(&mut self, mut on_progress: F) -> SimResult<LoopState>
    where
        F: FnMut(&TickProgress),
    {
        loop {
            let state = self.tick()?.clone();
            if self.state == LoopState::Running || state == LoopState::Completed {
                on_progress(&self.progress());
            }
            if state.is_finished() {
                return Ok(state);
            }
        }
    }

    /// Back to `Idle` with fresh block state, an empty historian and a
    /// cleared abort flag. Names stay registered.
    pub fn reset(&mut self) {
        for (_, generator) in &mut self.generators {
            generator.reset();
        }
        self.regulator.1.reset();
        self.plant.1.reset();
        self.historian.clear();
        self.abort.clear();
        self.state = LoopState::Idle;
        self.step = 0;
        self.measured = 0.0;
        tracing::debug!("loop '{}' reset", self.name);
    }

    pub fn progress(&self) -> TickProgress {
        let t_end_s = self.steps as Real * self.period_s;
        TickProgress {
            step: self.step,
            steps: self.steps,
            sim_time_s: self.step.saturating_sub(1) as Real * self.period_s,
            t_end_s,
            fraction_complete: if self.steps == 0 {
                1.0
            } else {
                self.step as Real / self.steps as Real
            },
            warnings: self.historian.warnings().len(),
        }
    }

    fn start(&mut self) {
        self.state = LoopState::Running;
        tracing::info!(
            "loop '{}' started: {} steps at {} s, {} generator(s), {} regulator, {} plant model(s)",
            self.name,
            self.steps,
            self.period_s,
            self.generators.len(),
            self.regulator.1.kind(),
            self.plant.1.model_count()
        );
    }

    fn advance(&mut self) -> SimResult<()> {
        let t = self.sim_time_s();

        let mut setpoint = 0.0;
        for (entity, generator) in &mut self.generators {
            setpoint += generator
                .step(0.0, t)
                .map_err(|e| block_failure(&entity.name, e))?;
        }

        let regulator = &mut self.regulator.1;
        let preview = regulator.preview_len();
        let mut trajectory = vec![0.0; preview.max(1)];
        trajectory[0] = setpoint;
        if preview > 1 {
            // generators preview on clones, their own state is untouched
            for (_, generator) in &self.generators {
                let ahead = generator.preview(t + self.period_s, self.period_s, preview - 1);
                for (slot, value) in trajectory[1..].iter_mut().zip(ahead) {
                    *slot += value;
                }
            }
        }
        regulator.set_setpoint_trajectory(&trajectory);

        let regulator_name = &self.regulator.0.name;
        let measured = self.measured;
        let step_result = regulator.step(measured, t);
        record_conditions(&mut self.historian, t, regulator_name, regulator.conditions());
        let u = step_result
            .and_then(|u| ensure_finite(u, "regulator output"))
            .map_err(|e| block_failure(regulator_name, e))?;

        let plant_name = &self.plant.0.name;
        let y = self
            .plant
            .1
            .step(u, t)
            .map_err(|e| block_failure(plant_name, e))?;
        record_conditions(&mut self.historian, t, plant_name, self.plant.1.conditions());

        let error = setpoint - measured;
        self.historian.record(CHANNEL_GENERATOR, t, setpoint)?;
        self.historian.record(CHANNEL_REGULATOR, t, u)?;
        self.historian.record(CHANNEL_PLANT, t, y)?;
        self.historian.record(CHANNEL_ERROR, t, error)?;
        tracing::trace!(step = self.step, t, setpoint, u, y, error, "tick");

        self.measured = y;
        self.step += 1;
        Ok(())
    }

    fn finish_completed(&mut self) {
        self.state = LoopState::Completed;
        tracing::info!(
            "loop '{}' completed after {} steps ({} warning(s))",
            self.name,
            self.step,
            self.historian.warnings().len()
        );
    }

    fn finish_aborted(&mut self, reason: String) {
        tracing::error!(
            "loop '{}' aborted at step {} (t = {} s): {}",
            self.name,
            self.step,
            self.sim_time_s(),
            reason
        );
        self.state = LoopState::Aborted { reason };
    }

    fn wrong_state(&self, action: &'static str, expected: &'static str) -> SimError {
        SimError::InvalidState {
            state: self.state.to_string(),
            action,
            expected,
        }
    }
}

fn record_conditions(historian: &mut Historian, t: Real, source: &str, conditions: &[Condition]) {
    for condition in conditions {
        tracing::warn!("{} at t = {} s: {}", source, t, condition);
        historian.record_warning(t, source, condition.clone());
    }
}

fn block_failure(name: &str, source: ls_core::CoreError) -> SimError {
    SimError::BlockFailed {
        block: name.to_string(),
        source,
    }
}
