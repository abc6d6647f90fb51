//! Regulator selection and construction.

use ls_core::{Condition, CoreResult, Real, SisoBlock};
use serde::{Deserialize, Serialize};

use crate::error::ControlResult;
use crate::gpc::{GPCConfig, GPCRegulator};
use crate::pid::{PIDController, PIDRegulator};
use crate::proportional::PRegulator;

/// Serializable regulator choice, as stored in loop definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegulatorSpec {
    Proportional { kp: Real },
    Pid(PIDController),
    Gpc(GPCConfig),
}

impl RegulatorSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            RegulatorSpec::Proportional { .. } => "proportional",
            RegulatorSpec::Pid(_) => "pid",
            RegulatorSpec::Gpc(_) => "gpc",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Regulator {
    Proportional(PRegulator),
    Pid(PIDRegulator),
    Gpc(GPCRegulator),
}

impl Regulator {
    pub fn kind(&self) -> &'static str {
        match self {
            Regulator::Proportional(_) => "proportional",
            Regulator::Pid(_) => "pid",
            Regulator::Gpc(_) => "gpc",
        }
    }

    pub fn sampling_period(&self) -> Real {
        match self {
            Regulator::Proportional(r) => r.sampling_period(),
            Regulator::Pid(r) => r.sampling_period(),
            Regulator::Gpc(r) => r.sampling_period(),
        }
    }

    /// How many setpoint samples, starting at the current tick, the
    /// regulator looks at.
    pub fn preview_len(&self) -> usize {
        match self {
            Regulator::Gpc(r) => r.preview_len(),
            _ => 1,
        }
    }

    /// Hand over `r[k], r[k+1], ..`. Non-predictive regulators only use the
    /// first sample; an empty slice keeps the previous setpoint.
    pub fn set_setpoint_trajectory(&mut self, trajectory: &[Real]) {
        match self {
            Regulator::Proportional(r) => {
                if let Some(&sp) = trajectory.first() {
                    r.set_setpoint(sp);
                }
            }
            Regulator::Pid(r) => {
                if let Some(&sp) = trajectory.first() {
                    r.set_setpoint(sp);
                }
            }
            Regulator::Gpc(r) => {
                if !trajectory.is_empty() {
                    r.set_setpoint_trajectory(trajectory);
                }
            }
        }
    }
}

impl SisoBlock for Regulator {
    fn reset(&mut self) {
        match self {
            Regulator::Proportional(r) => r.reset(),
            Regulator::Pid(r) => r.reset(),
            Regulator::Gpc(r) => r.reset(),
        }
    }

    fn step(&mut self, measured: Real, t: Real) -> CoreResult<Real> {
        match self {
            Regulator::Proportional(r) => r.step(measured, t),
            Regulator::Pid(r) => r.step(measured, t),
            Regulator::Gpc(r) => r.step(measured, t),
        }
    }

    fn conditions(&self) -> &[Condition] {
        match self {
            Regulator::Gpc(r) => r.conditions(),
            _ => &[],
        }
    }
}

/// Build a regulator running at `period_s`.
pub fn create_regulator(spec: &RegulatorSpec, period_s: Real) -> ControlResult<Regulator> {
    Ok(match spec {
        RegulatorSpec::Proportional { kp } => {
            Regulator::Proportional(PRegulator::new(*kp, period_s)?)
        }
        RegulatorSpec::Pid(pid) => Regulator::Pid(PIDRegulator::new(pid.clone(), period_s)?),
        RegulatorSpec::Gpc(cfg) => Regulator::Gpc(GPCRegulator::new(cfg.clone(), period_s)?),
    })
}
