//! ARX coefficient sets.
//!
//! Convention: `y[k] = -Σ a_i y[k-i] + Σ b_j u[k-d-j]` with `i = 1..=na`,
//! `j = 0..nb` and transport delay `d`. For `d = 1`, `b[0]` multiplies
//! `u[k-1]`.

use ls_core::{Real, SampleHistory, ensure_all_finite};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArxCoefficients {
    /// Output coefficients `a_1..a_na`.
    pub a: Vec<Real>,
    /// Input coefficients `b_0..b_{nb-1}`.
    pub b: Vec<Real>,
    /// Transport delay in samples.
    #[serde(default)]
    pub delay: usize,
}

impl ArxCoefficients {
    pub fn new(a: Vec<Real>, b: Vec<Real>, delay: usize) -> ModelResult<Self> {
        let coeffs = Self { a, b, delay };
        coeffs.validate()?;
        Ok(coeffs)
    }

    /// `y[k] = pole * y[k-1] + gain * u[k-delay]`.
    pub fn first_order(pole: Real, gain: Real, delay: usize) -> ModelResult<Self> {
        Self::new(vec![-pole], vec![gain], delay)
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.b.is_empty() {
            return Err(ModelError::invalid("ARX model needs at least one b coefficient"));
        }
        ensure_all_finite(&self.a, "a coefficients")?;
        ensure_all_finite(&self.b, "b coefficients")?;
        Ok(())
    }

    pub fn na(&self) -> usize {
        self.a.len()
    }

    pub fn nb(&self) -> usize {
        self.b.len()
    }

    /// Input samples needed to evaluate one output, current input included.
    pub fn input_depth(&self) -> usize {
        self.delay + self.b.len()
    }

    /// True when `other` has the same na, nb and delay.
    pub fn same_shape(&self, other: &ArxCoefficients) -> bool {
        self.na() == other.na() && self.nb() == other.nb() && self.delay == other.delay
    }

    /// Output for the current step.
    ///
    /// `outputs.get(0)` must be `y[k-1]` and `inputs.get(0)` must be `u[k]`.
    pub fn predict(&self, outputs: &SampleHistory, inputs: &SampleHistory) -> Real {
        let forced: Real = self
            .b
            .iter()
            .enumerate()
            .map(|(j, b)| b * inputs.get(self.delay + j))
            .sum();
        let free: Real = self
            .a
            .iter()
            .enumerate()
            .map(|(i, a)| a * outputs.get(i))
            .sum();
        forced - free
    }

    /// Steady-state gain `Σb / (1 + Σa)`, `None` for a pole at z = 1.
    pub fn dc_gain(&self) -> Option<Real> {
        let den = 1.0 + self.a.iter().sum::<Real>();
        if den.abs() < 1e-12 {
            None
        } else {
            Some(self.b.iter().sum::<Real>() / den)
        }
    }

    /// Response to a unit step applied at k = 0, for `count` samples.
    pub fn step_response(&self, count: usize) -> Vec<Real> {
        let mut outputs = SampleHistory::new(self.na());
        let mut inputs = SampleHistory::new(self.input_depth());
        (0..count)
            .map(|_| {
                inputs.push(1.0);
                let y = self.predict(&outputs, &inputs);
                outputs.push(y);
                y
            })
            .collect()
    }

    /// Flatten to `[a_1..a_na, b_0..b_{nb-1}]`.
    pub fn to_theta(&self) -> Vec<Real> {
        self.a.iter().chain(self.b.iter()).copied().collect()
    }

    /// Inverse of [`Self::to_theta`] for a known structure.
    pub fn from_theta(theta: &[Real], na: usize, delay: usize) -> ModelResult<Self> {
        if theta.len() <= na {
            return Err(ModelError::invalid(format!(
                "theta of length {} cannot hold {na} a coefficients and at least one b",
                theta.len()
            )));
        }
        let (a, b) = theta.split_at(na);
        Self::new(a.to_vec(), b.to_vec(), delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_order_step_response() {
        let c = ArxCoefficients::first_order(0.9, 0.1, 1).unwrap();
        let s = c.step_response(4);
        assert_eq!(s[0], 0.0);
        assert!((s[1] - 0.1).abs() < 1e-12);
        assert!((s[2] - 0.19).abs() < 1e-12);
        assert!((s[3] - 0.271).abs() < 1e-12);
    }

    #[test]
    fn zero_delay_is_direct_feedthrough() {
        let c = ArxCoefficients::first_order(0.5, 2.0, 0).unwrap();
        assert_eq!(c.step_response(1), vec![2.0]);
    }

    #[test]
    fn dc_gain_of_first_order() {
        let c = ArxCoefficients::first_order(0.9, 0.1, 1).unwrap();
        assert!((c.dc_gain().unwrap() - 1.0).abs() < 1e-12);
        let integrator = ArxCoefficients::first_order(1.0, 1.0, 1).unwrap();
        assert!(integrator.dc_gain().is_none());
    }

    #[test]
    fn theta_round_trip_keeps_structure() {
        let c = ArxCoefficients::new(vec![-1.2, 0.35], vec![0.5, 0.25], 2).unwrap();
        let back = ArxCoefficients::from_theta(&c.to_theta(), 2, 2).unwrap();
        assert_eq!(c, back);
        assert!(ArxCoefficients::from_theta(&[0.1, 0.2], 2, 1).is_err());
    }

    #[test]
    fn empty_b_is_invalid() {
        assert!(matches!(
            ArxCoefficients::new(vec![0.5], vec![], 1),
            Err(ModelError::InvalidParameter { .. })
        ));
        assert!(ArxCoefficients::new(vec![Real::NAN], vec![1.0], 1).is_err());
    }
}
