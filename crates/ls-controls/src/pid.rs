//! PID regulator.
//!
//! The control law is a pure function of configuration and state
//! ([`PIDController::update`]); [`PIDRegulator`] owns the state and plugs the
//! law into the loop as a SISO block.
//!
//! Features:
//! - Integral clamping to a configurable bound
//! - Conditional integration while the output is saturated
//! - First-order filtered derivative of the error, no kick on the first sample

use ls_core::{CoreResult, Real, SisoBlock, ensure_positive};
use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

/// PID controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PIDController {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain (per second).
    pub ki: f64,
    /// Derivative gain (seconds).
    pub kd: f64,
    /// Bound on the accumulated error integral (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integral_limit: Option<f64>,
    /// Derivative filter time constant (seconds). 0 disables filtering.
    #[serde(default)]
    pub derivative_filter_s: f64,
    /// Minimum output value (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_min: Option<f64>,
    /// Maximum output value (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_max: Option<f64>,
}

impl PIDController {
    /// Create an unclamped PID controller.
    pub fn new(kp: f64, ki: f64, kd: f64) -> ControlResult<Self> {
        let pid = Self {
            kp,
            ki,
            kd,
            integral_limit: None,
            derivative_filter_s: 0.0,
            out_min: None,
            out_max: None,
        };
        pid.validate()?;
        Ok(pid)
    }

    /// Set integral windup limit.
    pub fn with_integral_limit(mut self, limit: f64) -> ControlResult<Self> {
        self.integral_limit = Some(limit);
        self.validate()?;
        Ok(self)
    }

    /// Set derivative filter time constant.
    pub fn with_derivative_filter(mut self, tau_s: f64) -> ControlResult<Self> {
        self.derivative_filter_s = tau_s;
        self.validate()?;
        Ok(self)
    }

    /// Set output limits.
    pub fn with_output_limits(mut self, out_min: f64, out_max: f64) -> ControlResult<Self> {
        self.out_min = Some(out_min);
        self.out_max = Some(out_max);
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> ControlResult<()> {
        for (value, what) in [(self.kp, "kp"), (self.ki, "ki"), (self.kd, "kd")] {
            if !value.is_finite() {
                return Err(ControlError::invalid(format!("{what} must be finite (got {value})")));
            }
        }
        if let Some(limit) = self.integral_limit {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(ControlError::invalid(format!(
                    "integral_limit must be positive (got {limit})"
                )));
            }
        }
        if !(self.derivative_filter_s.is_finite() && self.derivative_filter_s >= 0.0) {
            return Err(ControlError::invalid("derivative_filter_s must be non-negative"));
        }
        if let (Some(lo), Some(hi)) = (self.out_min, self.out_max) {
            if !(lo < hi) {
                return Err(ControlError::invalid("out_min must be less than out_max"));
            }
        }
        Ok(())
    }

    /// Compute controller output.
    ///
    /// # Arguments
    ///
    /// * `state` - Controller state (integral, last error, filtered derivative)
    /// * `pv` - Process variable (measured value)
    /// * `sp` - Setpoint (desired value)
    /// * `dt` - Sampling period (seconds)
    ///
    /// # Returns
    ///
    /// Updated state and output value.
    pub fn update(
        &self,
        state: &PIDControllerState,
        pv: f64,
        sp: f64,
        dt: f64,
    ) -> (PIDControllerState, f64) {
        // Error: e = sp - pv (positive error means PV is below setpoint)
        let error = sp - pv;

        let p_term = self.kp * error;

        // Integral term, clamped
        let new_integral = state.integral + error * dt;
        let clamped_integral = match self.integral_limit {
            Some(limit) => new_integral.clamp(-limit, limit),
            None => new_integral,
        };
        let i_term = self.ki * clamped_integral;

        // Derivative of the error, first-order filtered:
        // filt[n] = alpha * filt[n-1] + (1-alpha) * raw
        let raw_derivative = match state.prev_error {
            Some(prev) => (error - prev) / dt,
            None => 0.0,
        };
        let alpha = self.derivative_filter_s / (self.derivative_filter_s + dt);
        let filtered_derivative =
            alpha * state.filtered_derivative + (1.0 - alpha) * raw_derivative;
        let d_term = self.kd * filtered_derivative;

        let output_raw = p_term + i_term + d_term;
        let output = self.clamp_output(output_raw);

        // Anti-windup: keep the old integral while saturated
        let final_integral = if output == output_raw {
            clamped_integral
        } else {
            state.integral
        };

        let new_state = PIDControllerState {
            integral: final_integral,
            prev_error: Some(error),
            filtered_derivative,
        };

        (new_state, output)
    }

    fn clamp_output(&self, value: f64) -> f64 {
        let lower = self.out_min.map_or(value, |lo| value.max(lo));
        self.out_max.map_or(lower, |hi| lower.min(hi))
    }
}

/// PID controller state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PIDControllerState {
    /// Integral accumulator.
    pub integral: f64,
    /// Error from the previous sample, `None` before the first one.
    pub prev_error: Option<f64>,
    /// Filtered error derivative.
    pub filtered_derivative: f64,
}

/// A [`PIDController`] running at a fixed sampling period.
#[derive(Debug, Clone, PartialEq)]
pub struct PIDRegulator {
    controller: PIDController,
    state: PIDControllerState,
    period_s: Real,
    setpoint: Real,
}

impl PIDRegulator {
    pub fn new(controller: PIDController, period_s: Real) -> ControlResult<Self> {
        controller.validate()?;
        ensure_positive(period_s, "sampling period")?;
        Ok(Self {
            controller,
            state: PIDControllerState::default(),
            period_s,
            setpoint: 0.0,
        })
    }

    pub fn controller(&self) -> &PIDController {
        &self.controller
    }

    pub fn state(&self) -> &PIDControllerState {
        &self.state
    }

    pub fn sampling_period(&self) -> Real {
        self.period_s
    }

    pub fn set_setpoint(&mut self, setpoint: Real) {
        self.setpoint = setpoint;
    }
}

impl SisoBlock for PIDRegulator {
    fn reset(&mut self) {
        self.state = PIDControllerState::default();
        self.setpoint = 0.0;
    }

    fn step(&mut self, measured: Real, _t: Real) -> CoreResult<Real> {
        let (state, output) = self
            .controller
            .update(&self.state, measured, self.setpoint, self.period_s);
        self.state = state;
        Ok(output)
    }
}
