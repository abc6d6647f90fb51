//! Proportional regulator.

use ls_core::{CoreResult, Real, SisoBlock, ensure_positive};

use crate::error::{ControlError, ControlResult};

/// `u = kp * (setpoint - measured)`. No state beyond the gain.
#[derive(Debug, Clone, PartialEq)]
pub struct PRegulator {
    kp: Real,
    period_s: Real,
    setpoint: Real,
}

impl PRegulator {
    pub fn new(kp: Real, period_s: Real) -> ControlResult<Self> {
        if !kp.is_finite() {
            return Err(ControlError::invalid(format!("kp must be finite (got {kp})")));
        }
        ensure_positive(period_s, "sampling period")?;
        Ok(Self {
            kp,
            period_s,
            setpoint: 0.0,
        })
    }

    pub fn gain(&self) -> Real {
        self.kp
    }

    pub fn sampling_period(&self) -> Real {
        self.period_s
    }

    pub fn setpoint(&self) -> Real {
        self.setpoint
    }

    pub fn set_setpoint(&mut self, setpoint: Real) {
        self.setpoint = setpoint;
    }
}

impl SisoBlock for PRegulator {
    /// The gain is configuration; only the setpoint returns to zero.
    fn reset(&mut self) {
        self.setpoint = 0.0;
    }

    fn step(&mut self, measured: Real, _t: Real) -> CoreResult<Real> {
        Ok(self.kp * (self.setpoint - measured))
    }
}
