//! Generalized Predictive Control on an online-identified ARX model.
//!
//! Each step:
//! 1. feed `(u[k-1], y[k])` to the RLS identifier
//! 2. pick the model: the configured initial model until the identifier has
//!    accepted `warmup_updates` samples, the identified one afterwards
//! 3. build the dynamic matrix `G` (N×Nu) from the model's step response and
//!    the free response `f` with the input held at `u[k-1]`
//! 4. smooth the reference: `w_0 = y[k]`, `w_i = α w_{i-1} + (1-α) r[k+i]`
//! 5. solve `(GᵀG + ρI) Δu = Gᵀ(w - f)` and apply `u[k] = u[k-1] + Δu_0`
//!
//! If `GᵀG + ρI` is numerically singular the previous command is held and a
//! `ControlComputationDegenerate` condition is raised.

use ls_core::{Condition, CoreResult, Real, SampleHistory, SisoBlock, ensure_positive};
use ls_ident::{ArxIdentifier, IdentifierConfig, UpdateOutcome};
use ls_models::ArxCoefficients;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

/// Reciprocal condition number below which the control law is rejected.
const MIN_RCOND: Real = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GPCConfig {
    /// Prediction horizon N.
    pub prediction_horizon: usize,
    /// Control horizon Nu, `1 <= Nu <= N`.
    pub control_horizon: usize,
    /// Control-effort weight ρ.
    pub control_weight: Real,
    /// Reference smoothing α in `[0, 1)`; 0 tracks the raw setpoint.
    pub reference_smoothing: Real,
    /// Structure and tuning of the embedded identifier.
    pub identifier: IdentifierConfig,
    /// Accepted identifier updates before the estimate is trusted.
    /// Defaults to the prediction horizon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warmup_updates: Option<usize>,
    /// Model used until the warm-up completes.
    pub initial_model: ArxCoefficients,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_min: Option<Real>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_max: Option<Real>,
}

impl Default for GPCConfig {
    fn default() -> Self {
        Self {
            prediction_horizon: 3,
            control_horizon: 2,
            control_weight: 0.5,
            reference_smoothing: 0.4,
            identifier: IdentifierConfig::default(),
            warmup_updates: None,
            initial_model: ArxCoefficients {
                a: vec![-0.5],
                b: vec![0.5],
                delay: 1,
            },
            out_min: None,
            out_max: None,
        }
    }
}

impl GPCConfig {
    pub fn validate(&self) -> ControlResult<()> {
        if self.prediction_horizon == 0 {
            return Err(ControlError::invalid("prediction horizon must be at least 1"));
        }
        if self.control_horizon == 0 || self.control_horizon > self.prediction_horizon {
            return Err(ControlError::invalid(format!(
                "control horizon must lie in [1, {}] (got {})",
                self.prediction_horizon, self.control_horizon
            )));
        }
        if !(self.control_weight.is_finite() && self.control_weight >= 0.0) {
            return Err(ControlError::invalid(format!(
                "control weight must be non-negative (got {})",
                self.control_weight
            )));
        }
        if !(0.0..1.0).contains(&self.reference_smoothing) {
            return Err(ControlError::invalid(format!(
                "reference smoothing must lie in [0, 1) (got {})",
                self.reference_smoothing
            )));
        }
        if let (Some(lo), Some(hi)) = (self.out_min, self.out_max) {
            if !(lo < hi) {
                return Err(ControlError::invalid("out_min must be less than out_max"));
            }
        }
        self.identifier.validate()?;
        self.initial_model.validate()?;
        Ok(())
    }

    pub fn warmup(&self) -> usize {
        self.warmup_updates.unwrap_or(self.prediction_horizon)
    }
}

#[derive(Debug, Clone)]
pub struct GPCRegulator {
    config: GPCConfig,
    period_s: Real,
    identifier: ArxIdentifier,
    /// `u[k-1]` at index 0.
    inputs: SampleHistory,
    /// `y[k]` at index 0 once the step has started.
    outputs: SampleHistory,
    last_input: Real,
    trajectory: Vec<Real>,
    last_moves: Vec<Real>,
    conditions: Vec<Condition>,
}

impl GPCRegulator {
    pub fn new(config: GPCConfig, period_s: Real) -> ControlResult<Self> {
        config.validate()?;
        ensure_positive(period_s, "sampling period")?;
        let identifier = ArxIdentifier::new(config.identifier.clone())?;
        let id_cfg = &config.identifier;
        let input_depth = config
            .initial_model
            .input_depth()
            .max(id_cfg.delay + id_cfg.nb);
        let output_depth = config.initial_model.na().max(id_cfg.na) + 1;
        Ok(Self {
            inputs: SampleHistory::new(input_depth),
            outputs: SampleHistory::new(output_depth),
            identifier,
            config,
            period_s,
            last_input: 0.0,
            trajectory: Vec::new(),
            last_moves: Vec::new(),
            conditions: Vec::new(),
        })
    }

    pub fn config(&self) -> &GPCConfig {
        &self.config
    }

    pub fn sampling_period(&self) -> Real {
        self.period_s
    }

    pub fn identifier(&self) -> &ArxIdentifier {
        &self.identifier
    }

    /// Setpoint samples `r[k], r[k+1], ..`; the last one is held beyond its end.
    pub fn set_setpoint_trajectory(&mut self, trajectory: &[Real]) {
        self.trajectory.clear();
        self.trajectory.extend_from_slice(trajectory);
    }

    /// Future setpoint samples the regulator can use, current one included.
    pub fn preview_len(&self) -> usize {
        self.config.prediction_horizon + 1
    }

    /// Whether the identified model has replaced the initial one.
    pub fn model_identified(&self) -> bool {
        self.identifier.accepted_updates() >= self.config.warmup()
    }

    /// The model the next control law will be computed from.
    pub fn active_model(&self) -> ArxCoefficients {
        if self.model_identified() {
            if let Ok(model) = self.identifier.coefficients() {
                return model;
            }
        }
        self.config.initial_model.clone()
    }

    /// Control moves `Δu_0..Δu_{Nu-1}` from the latest solve.
    pub fn last_moves(&self) -> &[Real] {
        &self.last_moves
    }

    /// Dynamic matrix `G[i][j] = s[i + 1 - j]` from the step response `s`.
    pub fn dynamic_matrix(model: &ArxCoefficients, n: usize, nu: usize) -> DMatrix<Real> {
        let s = model.step_response(n + 1);
        DMatrix::from_fn(n, nu, |i, j| if i + 1 >= j { s[i + 1 - j] } else { 0.0 })
    }

    /// Predicted `y[k+1..=k+N]` with the input frozen at `u[k-1]`.
    fn free_response(&self, model: &ArxCoefficients) -> DVector<Real> {
        let mut outputs = self.outputs.clone();
        let mut inputs = self.inputs.clone();
        let n = self.config.prediction_horizon;
        // u[k] itself is held too
        inputs.push(self.last_input);
        DVector::from_iterator(
            n,
            (0..n).map(|_| {
                inputs.push(self.last_input);
                let y = model.predict(&outputs, &inputs);
                outputs.push(y);
                y
            }),
        )
    }

    fn reference(&self, y: Real) -> DVector<Real> {
        let alpha = self.config.reference_smoothing;
        let n = self.config.prediction_horizon;
        let held = self.trajectory.last().copied().unwrap_or(0.0);
        let mut w = y;
        DVector::from_iterator(
            n,
            (1..=n).map(|i| {
                let r = self.trajectory.get(i).copied().unwrap_or(held);
                w = alpha * w + (1.0 - alpha) * r;
                w
            }),
        )
    }

    fn solve_moves(
        &self,
        g: &DMatrix<Real>,
        error: &DVector<Real>,
    ) -> Result<DVector<Real>, String> {
        // an overflowing prediction would poison the SVD below
        if g.iter().any(|v| !v.is_finite()) {
            return Err("dynamic matrix is not finite".to_string());
        }
        if error.iter().any(|v| !v.is_finite()) {
            return Err("predicted tracking error is not finite".to_string());
        }
        let nu = g.ncols();
        let gt = g.transpose();
        let h = &gt * g + DMatrix::<Real>::identity(nu, nu) * self.config.control_weight;
        if h.iter().any(|v| !v.is_finite()) {
            return Err("GᵀG + ρI is not finite".to_string());
        }
        let singular = h.singular_values();
        let max_sv = singular.max();
        let min_sv = singular.min();
        if !(max_sv.is_finite() && min_sv > MIN_RCOND * max_sv) {
            return Err(format!(
                "GᵀG + ρI is ill-conditioned (σ_min = {min_sv:e}, σ_max = {max_sv:e})"
            ));
        }
        let rhs = &gt * error;
        let moves = h
            .lu()
            .solve(&rhs)
            .ok_or_else(|| "LU solve of GᵀG + ρI failed".to_string())?;
        if moves.iter().any(|v| !v.is_finite()) {
            return Err("control moves are not finite".to_string());
        }
        Ok(moves)
    }

    fn clamp(&self, u: Real) -> Real {
        let lower = self.config.out_min.map_or(u, |lo| u.max(lo));
        self.config.out_max.map_or(lower, |hi| lower.min(hi))
    }
}

impl SisoBlock for GPCRegulator {
    fn reset(&mut self) {
        self.identifier.reset();
        self.inputs.clear();
        self.outputs.clear();
        self.last_input = 0.0;
        self.trajectory.clear();
        self.last_moves.clear();
        self.conditions.clear();
    }

    fn step(&mut self, measured: Real, _t: Real) -> CoreResult<Real> {
        self.conditions.clear();

        // identification completes before the control law is computed
        let outcome = self.identifier.update(self.last_input, measured);
        if let UpdateOutcome::Stalled(condition) = outcome {
            self.conditions.push(condition);
        }
        self.outputs.push(measured);

        let model = self.active_model();
        let n = self.config.prediction_horizon;
        let nu = self.config.control_horizon;
        let g = Self::dynamic_matrix(&model, n, nu);
        let free = self.free_response(&model);
        let w = self.reference(measured);

        let u = match self.solve_moves(&g, &(w - free)) {
            Ok(moves) => {
                let u = self.clamp(self.last_input + moves[0]);
                self.last_moves = moves.iter().copied().collect();
                u
            }
            Err(reason) => {
                self.conditions
                    .push(Condition::ControlComputationDegenerate { reason });
                self.last_moves.clear();
                self.last_input
            }
        };

        self.inputs.push(u);
        self.last_input = u;
        Ok(u)
    }

    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tuning_is_valid() {
        let cfg = GPCConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.warmup(), 3);
    }

    #[test]
    fn invalid_horizons_rejected() {
        let cfg = GPCConfig {
            control_horizon: 4,
            ..Default::default()
        };
        assert!(matches!(
            GPCRegulator::new(cfg, 0.1),
            Err(ControlError::InvalidParameter { .. })
        ));
        let cfg = GPCConfig {
            reference_smoothing: 1.0,
            ..Default::default()
        };
        assert!(GPCRegulator::new(cfg, 0.1).is_err());
        let cfg = GPCConfig {
            identifier: IdentifierConfig {
                delay: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            GPCRegulator::new(cfg, 0.1),
            Err(ControlError::Ident(_))
        ));
    }

    #[test]
    fn dynamic_matrix_is_lower_toeplitz() {
        let model = ArxCoefficients::first_order(0.9, 0.1, 1).unwrap();
        let g = GPCRegulator::dynamic_matrix(&model, 3, 2);
        assert!((g[(0, 0)] - 0.1).abs() < 1e-12);
        assert!((g[(1, 0)] - 0.19).abs() < 1e-12);
        assert!((g[(2, 0)] - 0.271).abs() < 1e-12);
        // s[0] = 0 for a unit-delay model
        assert_eq!(g[(0, 1)], 0.0);
        assert!((g[(1, 1)] - 0.1).abs() < 1e-12);
        assert!((g[(2, 1)] - 0.19).abs() < 1e-12);
    }

    #[test]
    fn reference_is_smoothed_towards_setpoint() {
        let cfg = GPCConfig {
            reference_smoothing: 0.5,
            ..Default::default()
        };
        let mut gpc = GPCRegulator::new(cfg, 0.1).unwrap();
        gpc.set_setpoint_trajectory(&[1.0]);
        let w = gpc.reference(0.0);
        assert_eq!(w.as_slice(), &[0.5, 0.75, 0.875]);
    }

    #[test]
    fn singular_law_holds_previous_command() {
        let cfg = GPCConfig {
            control_weight: 0.0,
            initial_model: ArxCoefficients::new(vec![-0.5], vec![0.0], 1).unwrap(),
            warmup_updates: Some(usize::MAX),
            ..Default::default()
        };
        let mut gpc = GPCRegulator::new(cfg, 0.1).unwrap();
        gpc.set_setpoint_trajectory(&[1.0; 4]);
        for k in 0..5 {
            let u = gpc.step(0.0, k as Real * 0.1).unwrap();
            assert_eq!(u, 0.0);
            assert!(
                gpc.conditions()
                    .iter()
                    .any(|c| matches!(c, Condition::ControlComputationDegenerate { .. }))
            );
        }
    }

    #[test]
    fn overflowing_model_holds_previous_command() {
        let cfg = GPCConfig {
            prediction_horizon: 10,
            initial_model: ArxCoefficients::new(vec![-1e100], vec![1.0], 1).unwrap(),
            warmup_updates: Some(usize::MAX),
            ..Default::default()
        };
        let mut gpc = GPCRegulator::new(cfg, 0.1).unwrap();
        gpc.set_setpoint_trajectory(&[1.0; 11]);
        for k in 0..3 {
            let u = gpc.step(0.0, k as Real * 0.1).unwrap();
            assert_eq!(u, 0.0);
            assert!(gpc.last_moves().is_empty());
            assert!(
                gpc.conditions()
                    .iter()
                    .any(|c| matches!(c, Condition::ControlComputationDegenerate { .. }))
            );
        }
    }

    #[test]
    fn first_step_moves_towards_setpoint() {
        let mut gpc = GPCRegulator::new(GPCConfig::default(), 0.1).unwrap();
        gpc.set_setpoint_trajectory(&[1.0; 4]);
        let u = gpc.step(0.0, 0.0).unwrap();
        assert!(u > 0.0);
        assert_eq!(gpc.last_moves().len(), 2);
        // zero regressor on the very first sample
        assert!(
            gpc.conditions()
                .iter()
                .any(|c| matches!(c, Condition::IdentificationStalled { .. }))
        );
    }

    #[test]
    fn output_limits_clamp_command() {
        let cfg = GPCConfig {
            out_min: Some(-0.1),
            out_max: Some(0.1),
            ..Default::default()
        };
        let mut gpc = GPCRegulator::new(cfg, 0.1).unwrap();
        gpc.set_setpoint_trajectory(&[100.0; 4]);
        assert_eq!(gpc.step(0.0, 0.0).unwrap(), 0.1);
    }
}
