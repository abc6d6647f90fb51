//! Recursive least-squares ARX identifier.
//!
//! Parameter vector `θ = [a_1..a_na, b_0..b_{nb-1}]`, regressor
//! `φ = [-y[k-1]..-y[k-na], u[k-d]..u[k-d-nb+1]]`. Per accepted sample:
//!
//! ```text
//! K = Pφ / (λ + φᵀPφ)
//! θ = θ + K (y - φᵀθ)
//! P = (P - K (Pφ)ᵀ) / λ
//! ```

use std::collections::VecDeque;

use ls_core::{Condition, Real, SampleHistory};
use ls_models::ArxCoefficients;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{IdentError, IdentResult};

/// Structure and tuning of an [`ArxIdentifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierConfig {
    /// Number of `a` coefficients.
    pub na: usize,
    /// Number of `b` coefficients.
    pub nb: usize,
    /// Transport delay in samples, at least 1.
    pub delay: usize,
    /// Forgetting factor λ in (0, 1]. 1 weighs all samples equally.
    pub forgetting: Real,
    /// Initial covariance `P0 = β·I`.
    pub initial_covariance: Real,
    /// Starting estimate; zeros when absent.
    pub initial_theta: Option<Vec<Real>>,
    /// Updates with `φᵀPφ` at or below this are skipped.
    pub min_information: Real,
    /// Rescale `P` when its trace exceeds this (covariance wind-up).
    pub max_covariance_trace: Option<Real>,
    /// Number of past estimates kept for inspection.
    pub theta_history: usize,
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            na: 1,
            nb: 1,
            delay: 1,
            forgetting: 1.0,
            initial_covariance: 1000.0,
            initial_theta: None,
            min_information: 1e-12,
            max_covariance_trace: Some(1e6),
            theta_history: 100,
        }
    }
}

impl IdentifierConfig {
    pub fn parameter_count(&self) -> usize {
        self.na + self.nb
    }

    pub fn validate(&self) -> IdentResult<()> {
        if self.nb == 0 {
            return Err(invalid("nb must be at least 1"));
        }
        if self.delay == 0 {
            return Err(invalid("identifier delay must be at least 1 sample"));
        }
        if !(self.forgetting > 0.0 && self.forgetting <= 1.0) {
            return Err(invalid(format!(
                "forgetting factor must lie in (0, 1] (got {})",
                self.forgetting
            )));
        }
        if !(self.initial_covariance.is_finite() && self.initial_covariance > 0.0) {
            return Err(invalid("initial covariance must be positive and finite"));
        }
        if !(self.min_information.is_finite() && self.min_information >= 0.0) {
            return Err(invalid("min_information must be non-negative and finite"));
        }
        if let Some(ceiling) = self.max_covariance_trace {
            let initial_trace = self.initial_covariance * self.parameter_count() as Real;
            if !(ceiling.is_finite() && ceiling >= initial_trace) {
                return Err(invalid(format!(
                    "max_covariance_trace must be finite and >= the initial trace {initial_trace}"
                )));
            }
        }
        if let Some(theta) = &self.initial_theta {
            if theta.len() != self.parameter_count() {
                return Err(invalid(format!(
                    "initial_theta has {} entries, structure needs {}",
                    theta.len(),
                    self.parameter_count()
                )));
            }
            if theta.iter().any(|v| !v.is_finite()) {
                return Err(invalid("initial_theta must be finite"));
            }
        }
        Ok(())
    }
}

/// Result of feeding one sample pair to the identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// Estimate refined; carries the a-priori prediction error.
    Accepted { prediction_error: Real },
    /// Estimate and covariance left untouched.
    Stalled(Condition),
}

impl UpdateOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, UpdateOutcome::Accepted { .. })
    }

    pub fn condition(&self) -> Option<&Condition> {
        match self {
            UpdateOutcome::Stalled(c) => Some(c),
            UpdateOutcome::Accepted { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArxIdentifier {
    config: IdentifierConfig,
    theta: DVector<Real>,
    p: DMatrix<Real>,
    inputs: SampleHistory,
    outputs: SampleHistory,
    history: VecDeque<DVector<Real>>,
    accepted: usize,
    stalled: usize,
    last_prediction_error: Option<Real>,
}

impl ArxIdentifier {
    pub fn new(config: IdentifierConfig) -> IdentResult<Self> {
        config.validate()?;
        let n = config.parameter_count();
        let theta = initial_theta(&config);
        Ok(Self {
            p: DMatrix::identity(n, n) * config.initial_covariance,
            inputs: SampleHistory::new(config.delay - 1 + config.nb),
            outputs: SampleHistory::new(config.na),
            history: VecDeque::with_capacity(config.theta_history),
            theta,
            config,
            accepted: 0,
            stalled: 0,
            last_prediction_error: None,
        })
    }

    pub fn config(&self) -> &IdentifierConfig {
        &self.config
    }

    /// Feed the input applied on the previous step and the output it produced.
    pub fn update(&mut self, input: Real, output: Real) -> UpdateOutcome {
        self.inputs.push(if input.is_finite() { input } else { 0.0 });
        let phi = self.regressor();

        if !output.is_finite() || phi.iter().any(|v| !v.is_finite()) {
            // hold the last output so later regressors stay aligned
            let held = self.outputs.get(0);
            self.outputs.push(held);
            return self.stall(format!("non-finite sample (u={input}, y={output})"));
        }

        let p_phi = &self.p * &phi;
        let information = phi.dot(&p_phi);
        let denominator = self.config.forgetting + information;
        if !information.is_finite() || information <= self.config.min_information {
            self.outputs.push(output);
            return self.stall(format!(
                "regressor carries no information (phi'P phi = {information:e})"
            ));
        }
        if !denominator.is_finite() || denominator <= Real::EPSILON {
            self.outputs.push(output);
            return self.stall(format!("gain denominator degenerate ({denominator:e})"));
        }

        let prediction_error = output - phi.dot(&self.theta);
        let gain = &p_phi / denominator;
        let theta = &self.theta + &gain * prediction_error;
        let mut p = (&self.p - &gain * p_phi.transpose()) / self.config.forgetting;
        p = (&p + p.transpose()) * 0.5;

        if theta.iter().any(|v| !v.is_finite()) || p.iter().any(|v| !v.is_finite()) {
            self.outputs.push(output);
            return self.stall("update produced non-finite estimate".to_string());
        }

        if let Some(ceiling) = self.config.max_covariance_trace {
            let trace = p.trace();
            if trace > ceiling {
                p *= ceiling / trace;
            }
        }

        self.theta = theta;
        self.p = p;
        self.outputs.push(output);
        self.accepted += 1;
        self.last_prediction_error = Some(prediction_error);
        self.remember_theta();
        UpdateOutcome::Accepted { prediction_error }
    }

    /// Current estimate as ARX coefficients.
    pub fn coefficients(&self) -> IdentResult<ArxCoefficients> {
        Ok(ArxCoefficients::from_theta(
            self.theta.as_slice(),
            self.config.na,
            self.config.delay,
        )?)
    }

    /// Denominator polynomial `[1, a_1, .., a_na]`.
    pub fn denominator(&self) -> Vec<Real> {
        std::iter::once(1.0)
            .chain(self.theta.iter().take(self.config.na).copied())
            .collect()
    }

    /// Numerator polynomial `[b_0, .., b_{nb-1}]`, delayed by `delay`.
    pub fn numerator(&self) -> Vec<Real> {
        self.theta.iter().skip(self.config.na).copied().collect()
    }

    pub fn theta(&self) -> &DVector<Real> {
        &self.theta
    }

    pub fn covariance(&self) -> &DMatrix<Real> {
        &self.p
    }

    /// Past estimates, oldest first.
    pub fn theta_history(&self) -> impl Iterator<Item = &DVector<Real>> {
        self.history.iter()
    }

    pub fn accepted_updates(&self) -> usize {
        self.accepted
    }

    pub fn stalled_updates(&self) -> usize {
        self.stalled
    }

    pub fn last_prediction_error(&self) -> Option<Real> {
        self.last_prediction_error
    }

    /// One-step-ahead prediction of the next output if `input` is applied now.
    pub fn predict_next(&self, input: Real) -> Real {
        let mut inputs = self.inputs.clone();
        inputs.push(input);
        let phi = build_regressor(&self.config, &self.outputs, &inputs);
        phi.dot(&self.theta)
    }

    pub fn reset(&mut self) {
        let n = self.config.parameter_count();
        self.theta = initial_theta(&self.config);
        self.p = DMatrix::identity(n, n) * self.config.initial_covariance;
        self.inputs.clear();
        self.outputs.clear();
        self.history.clear();
        self.accepted = 0;
        self.stalled = 0;
        self.last_prediction_error = None;
    }

    fn regressor(&self) -> DVector<Real> {
        build_regressor(&self.config, &self.outputs, &self.inputs)
    }

    fn stall(&mut self, reason: String) -> UpdateOutcome {
        self.stalled += 1;
        UpdateOutcome::Stalled(Condition::IdentificationStalled { reason })
    }

    fn remember_theta(&mut self) {
        if self.config.theta_history == 0 {
            return;
        }
        if self.history.len() == self.config.theta_history {
            self.history.pop_front();
        }
        self.history.push_back(self.theta.clone());
    }
}

/// `inputs.get(0)` is `u[k-1]`, `outputs.get(0)` is `y[k-1]`.
fn build_regressor(
    config: &IdentifierConfig,
    outputs: &SampleHistory,
    inputs: &SampleHistory,
) -> DVector<Real> {
    let lagged_outputs = (0..config.na).map(|i| -outputs.get(i));
    let lagged_inputs = (0..config.nb).map(|j| inputs.get(config.delay - 1 + j));
    DVector::from_iterator(config.parameter_count(), lagged_outputs.chain(lagged_inputs))
}

fn initial_theta(config: &IdentifierConfig) -> DVector<Real> {
    match &config.initial_theta {
        Some(theta) => DVector::from_column_slice(theta),
        None => DVector::zeros(config.parameter_count()),
    }
}

fn invalid(what: impl Into<String>) -> IdentError {
    IdentError::InvalidParameter { what: what.into() }
}
