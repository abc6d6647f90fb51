//! Fixed-order difference-equation plant.

use ls_core::{CoreResult, Real, SampleHistory, SisoBlock, ensure_finite, ensure_positive};

use crate::arx::ArxCoefficients;
use crate::error::{ModelError, ModelResult};

/// A linear plant `y[k] = -Σ a_i y[k-i] + Σ b_j u[k-d-j]`.
///
/// The order (`a.len()`) and history depth are fixed at construction;
/// coefficient updates must keep the same shape.
#[derive(Debug, Clone)]
pub struct DiscreteModel {
    coeffs: ArxCoefficients,
    period_s: Real,
    inputs: SampleHistory,
    outputs: SampleHistory,
    initial_inputs: Vec<Real>,
    initial_outputs: Vec<Real>,
}

impl DiscreteModel {
    /// Build a model, checking `order` against the number of `a` coefficients.
    pub fn new(order: usize, coeffs: ArxCoefficients, period_s: Real) -> ModelResult<Self> {
        ensure_positive(period_s, "sampling period")?;
        coeffs.validate()?;
        if coeffs.na() != order {
            return Err(ModelError::invalid(format!(
                "model order {order} does not match {} a coefficients",
                coeffs.na()
            )));
        }
        Ok(Self {
            inputs: SampleHistory::new(coeffs.input_depth()),
            outputs: SampleHistory::new(coeffs.na()),
            coeffs,
            period_s,
            initial_inputs: Vec::new(),
            initial_outputs: Vec::new(),
        })
    }

    /// Build from `z^-delay · N(z^-1) / D(z^-1)`, both polynomials in
    /// ascending powers of `z^-1`. `denominator[0]` normalizes the rest.
    pub fn from_transfer_function(
        numerator: &[Real],
        denominator: &[Real],
        delay: usize,
        period_s: Real,
    ) -> ModelResult<Self> {
        let (&d0, rest) = denominator
            .split_first()
            .ok_or_else(|| ModelError::invalid("transfer function denominator is empty"))?;
        if !d0.is_finite() || d0.abs() < 1e-300 {
            return Err(ModelError::invalid(format!(
                "leading denominator coefficient must be finite and non-zero (got {d0})"
            )));
        }
        let a: Vec<Real> = rest.iter().map(|d| d / d0).collect();
        let b: Vec<Real> = numerator.iter().map(|n| n / d0).collect();
        let order = a.len();
        Self::new(order, ArxCoefficients::new(a, b, delay)?, period_s)
    }

    pub fn order(&self) -> usize {
        self.coeffs.na()
    }

    pub fn sampling_period(&self) -> Real {
        self.period_s
    }

    pub fn coefficients(&self) -> &ArxCoefficients {
        &self.coeffs
    }

    /// Swap in new coefficients of the same shape; history is kept.
    pub fn set_coefficients(&mut self, coeffs: ArxCoefficients) -> ModelResult<()> {
        coeffs.validate()?;
        if !coeffs.same_shape(&self.coeffs) {
            return Err(ModelError::invalid(format!(
                "shape (na={}, nb={}, delay={}) differs from model (na={}, nb={}, delay={})",
                coeffs.na(),
                coeffs.nb(),
                coeffs.delay,
                self.coeffs.na(),
                self.coeffs.nb(),
                self.coeffs.delay
            )));
        }
        self.coeffs = coeffs;
        Ok(())
    }

    /// Set initial conditions, newest first: `inputs[0] = u[-1]`,
    /// `outputs[0] = y[-1]`. `reset` returns to these values.
    pub fn seed_history(&mut self, inputs: &[Real], outputs: &[Real]) -> ModelResult<()> {
        ls_core::ensure_all_finite(inputs, "seed inputs")?;
        ls_core::ensure_all_finite(outputs, "seed outputs")?;
        self.initial_inputs = inputs.to_vec();
        self.initial_outputs = outputs.to_vec();
        self.restore_initial();
        Ok(())
    }

    /// Most recent output, `0.0` before the first step.
    pub fn last_output(&self) -> Real {
        self.outputs.get(0)
    }

    fn restore_initial(&mut self) {
        self.inputs.set_from(&self.initial_inputs);
        self.outputs.set_from(&self.initial_outputs);
    }
}

impl SisoBlock for DiscreteModel {
    fn reset(&mut self) {
        self.restore_initial();
    }

    fn step(&mut self, input: Real, _t: Real) -> CoreResult<Real> {
        self.inputs.push(input);
        let y = ensure_finite(self.coeffs.predict(&self.outputs, &self.inputs), "plant output")?;
        self.outputs.push(y);
        Ok(y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ls_core::{CoreError, replay};
    use proptest::prelude::*;

    fn first_order() -> DiscreteModel {
        DiscreteModel::new(1, ArxCoefficients::first_order(0.9, 0.1, 1).unwrap(), 0.1).unwrap()
    }

    #[test]
    fn unit_step_response() {
        let mut m = first_order();
        let y: Vec<Real> = (0..3).map(|k| m.step(1.0, k as Real * 0.1).unwrap()).collect();
        assert_eq!(y[0], 0.0);
        assert!((y[1] - 0.1).abs() < 1e-12);
        assert!((y[2] - 0.19).abs() < 1e-12);
        assert_eq!(m.last_output(), y[2]);
    }

    #[test]
    fn order_mismatch_is_rejected() {
        let err = DiscreteModel::new(2, ArxCoefficients::first_order(0.9, 0.1, 1).unwrap(), 0.1)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidParameter { .. }));
    }

    #[test]
    fn non_positive_period_is_rejected() {
        let coeffs = ArxCoefficients::first_order(0.9, 0.1, 1).unwrap();
        assert!(matches!(
            DiscreteModel::new(1, coeffs.clone(), 0.0),
            Err(ModelError::Core(CoreError::InvalidParameter { .. }))
        ));
        assert!(DiscreteModel::new(1, coeffs, -0.1).is_err());
    }

    #[test]
    fn transfer_function_normalizes_denominator() {
        // 0.2 z^-1 / (2 - 1.8 z^-1) == 0.1 z^-1 / (1 - 0.9 z^-1)
        let tf = DiscreteModel::from_transfer_function(&[0.2], &[2.0, -1.8], 1, 0.1).unwrap();
        assert_eq!(tf.order(), 1);
        assert!((tf.coefficients().a[0] + 0.9).abs() < 1e-12);
        assert!((tf.coefficients().b[0] - 0.1).abs() < 1e-12);
        assert!(DiscreteModel::from_transfer_function(&[1.0], &[0.0, 1.0], 0, 0.1).is_err());
        assert!(DiscreteModel::from_transfer_function(&[1.0], &[], 0, 0.1).is_err());
    }

    #[test]
    fn set_coefficients_keeps_shape() {
        let mut m = first_order();
        m.set_coefficients(ArxCoefficients::first_order(0.5, 1.0, 1).unwrap())
            .unwrap();
        assert_eq!(m.coefficients().a, vec![-0.5]);
        let wider = ArxCoefficients::new(vec![0.1, 0.2], vec![1.0], 1).unwrap();
        assert!(m.set_coefficients(wider).is_err());
        assert_eq!(m.order(), 1);
    }

    #[test]
    fn seeded_history_survives_reset() {
        let mut m = first_order();
        m.seed_history(&[], &[1.0]).unwrap();
        let first = m.step(0.0, 0.0).unwrap();
        assert!((first - 0.9).abs() < 1e-12);
        m.step(0.0, 0.1).unwrap();
        m.reset();
        assert_eq!(m.step(0.0, 0.0).unwrap(), first);
    }

    #[test]
    fn overflow_is_fatal() {
        let coeffs = ArxCoefficients::new(vec![], vec![Real::MAX], 0).unwrap();
        let mut m = DiscreteModel::new(0, coeffs, 1.0).unwrap();
        let err = m.step(10.0, 0.0).unwrap_err();
        assert!(matches!(err, CoreError::NonFinite { .. }));
    }

    proptest! {
        #[test]
        fn replay_is_bit_identical(
            pole in -0.99f64..0.99,
            gain in -5.0f64..5.0,
            delay in 0usize..4,
            inputs in prop::collection::vec(-10.0f64..10.0, 1..50),
        ) {
            let coeffs = ArxCoefficients::first_order(pole, gain, delay).unwrap();
            let mut m = DiscreteModel::new(1, coeffs, 0.05).unwrap();
            let first = replay(&mut m, &inputs, 0.0, 0.05).unwrap();
            let second = replay(&mut m, &inputs, 0.0, 0.05).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
