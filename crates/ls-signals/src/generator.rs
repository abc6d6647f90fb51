//! Parametric waveform generators.
//!
//! Deterministic waveforms are closed-form functions of elapsed simulated
//! time. Noise draws from a seeded `StdRng`; `reset` reseeds it so a replay
//! produces the same sequence.

use std::f64::consts::TAU;

use ls_core::{CoreResult, Real, SisoBlock};
use rand::SeedableRng;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand_distr::{Normal, Uniform};
use serde::{Deserialize, Serialize};

use crate::error::{SignalError, SignalResult};

/// Distribution for the noise waveform. `amplitude` is the half-width
/// (uniform) or the standard deviation (gaussian).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseDistribution {
    #[default]
    Uniform,
    Gaussian,
}

/// Shape of a generator's output.
#[derive(Debug, Clone, PartialEq)]
pub enum Waveform {
    /// `offset` before `step_time_s`, `offset + amplitude` from then on.
    Step { step_time_s: Real },
    /// `offset + amplitude` for the first `duty` fraction of each period, `offset` otherwise.
    Pulse {
        period_s: Real,
        duty: Real,
        phase_rad: Real,
    },
    Sine { period_s: Real, phase_rad: Real },
    /// `offset ± amplitude`, high for the first `duty` fraction of each period.
    Square {
        period_s: Real,
        duty: Real,
        phase_rad: Real,
    },
    /// Zero-mean triangle in phase with the sine: 0, +A, 0, -A.
    Triangle { period_s: Real, phase_rad: Real },
    Noise {
        distribution: NoiseDistribution,
        seed: u64,
    },
}

#[derive(Debug, Clone)]
enum Sampler {
    Uniform(Uniform<Real>),
    Gaussian(Normal<Real>),
    /// Zero amplitude: the distribution would be degenerate.
    Silent,
}

#[derive(Debug, Clone)]
struct NoiseSource {
    seed: u64,
    rng: StdRng,
    sampler: Sampler,
}

impl NoiseSource {
    fn new(distribution: NoiseDistribution, amplitude: Real, seed: u64) -> SignalResult<Self> {
        if amplitude < 0.0 {
            return Err(SignalError::invalid(format!(
                "noise amplitude must be non-negative (got {amplitude})"
            )));
        }
        let sampler = if amplitude == 0.0 {
            Sampler::Silent
        } else {
            match distribution {
                NoiseDistribution::Uniform => {
                    // the sampler spans 2·amplitude, which must stay finite
                    if !(2.0 * amplitude).is_finite() {
                        return Err(SignalError::invalid(format!(
                            "uniform noise amplitude {amplitude:e} overflows its range"
                        )));
                    }
                    Sampler::Uniform(Uniform::new_inclusive(-amplitude, amplitude))
                }
                NoiseDistribution::Gaussian => Sampler::Gaussian(
                    Normal::new(0.0, amplitude).map_err(|e| SignalError::invalid(e.to_string()))?,
                ),
            }
        };
        Ok(Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
            sampler,
        })
    }

    fn draw(&mut self) -> Real {
        match &self.sampler {
            Sampler::Uniform(d) => d.sample(&mut self.rng),
            Sampler::Gaussian(d) => d.sample(&mut self.rng),
            Sampler::Silent => 0.0,
        }
    }

    fn reseed(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}

/// A signal source with its waveform, level and start delay.
#[derive(Debug, Clone)]
pub struct Generator {
    waveform: Waveform,
    amplitude: Real,
    offset: Real,
    start_s: Real,
    noise: Option<NoiseSource>,
    samples_emitted: u64,
}

impl Generator {
    /// Build a generator, validating every waveform parameter.
    ///
    /// Before `start_s` the output is `offset`.
    pub fn new(
        waveform: Waveform,
        amplitude: Real,
        offset: Real,
        start_s: Real,
    ) -> SignalResult<Self> {
        check_finite(amplitude, "amplitude")?;
        check_finite(offset, "offset")?;
        check_finite(start_s, "start_s")?;
        if start_s < 0.0 {
            return Err(SignalError::invalid("start_s must be non-negative"));
        }
        match &waveform {
            Waveform::Step { step_time_s } => check_finite(*step_time_s, "step_time_s")?,
            Waveform::Sine { period_s, phase_rad } | Waveform::Triangle { period_s, phase_rad } => {
                check_period(*period_s)?;
                check_finite(*phase_rad, "phase_rad")?;
            }
            Waveform::Pulse {
                period_s,
                duty,
                phase_rad,
            }
            | Waveform::Square {
                period_s,
                duty,
                phase_rad,
            } => {
                check_period(*period_s)?;
                check_finite(*phase_rad, "phase_rad")?;
                if !(0.0..=1.0).contains(duty) {
                    return Err(SignalError::invalid(format!(
                        "duty cycle must lie in [0, 1] (got {duty})"
                    )));
                }
            }
            Waveform::Noise { .. } => {}
        }
        let noise = match &waveform {
            Waveform::Noise { distribution, seed } => {
                Some(NoiseSource::new(*distribution, amplitude, *seed)?)
            }
            _ => None,
        };
        Ok(Self {
            waveform,
            amplitude,
            offset,
            start_s,
            noise,
            samples_emitted: 0,
        })
    }

    pub fn step_at(step_time_s: Real, amplitude: Real) -> SignalResult<Self> {
        Self::new(Waveform::Step { step_time_s }, amplitude, 0.0, 0.0)
    }

    pub fn waveform(&self) -> &Waveform {
        &self.waveform
    }

    pub fn amplitude(&self) -> Real {
        self.amplitude
    }

    pub fn offset(&self) -> Real {
        self.offset
    }

    pub fn start_s(&self) -> Real {
        self.start_s
    }

    /// Samples produced since construction or the last reset.
    pub fn samples_emitted(&self) -> u64 {
        self.samples_emitted
    }

    /// Output at simulated time `t`. Noise advances its random stream.
    pub fn sample(&mut self, t: Real) -> Real {
        self.samples_emitted += 1;
        if t < self.start_s {
            return self.offset;
        }
        let elapsed = t - self.start_s;
        let a = self.amplitude;
        let shape = match &self.waveform {
            Waveform::Step { step_time_s } => {
                if t >= *step_time_s {
                    a
                } else {
                    0.0
                }
            }
            Waveform::Pulse {
                period_s,
                duty,
                phase_rad,
            } => {
                if cycle_fraction(elapsed, *period_s, *phase_rad) < *duty {
                    a
                } else {
                    0.0
                }
            }
            Waveform::Sine {
                period_s,
                phase_rad,
            } => a * (TAU * cycle_fraction(elapsed, *period_s, *phase_rad)).sin(),
            Waveform::Square {
                period_s,
                duty,
                phase_rad,
            } => {
                if cycle_fraction(elapsed, *period_s, *phase_rad) < *duty {
                    a
                } else {
                    -a
                }
            }
            Waveform::Triangle { period_s, phase_rad } => {
                let f = cycle_fraction(elapsed, *period_s, *phase_rad);
                a * (4.0 * ((f + 0.75).rem_euclid(1.0) - 0.5).abs() - 1.0)
            }
            Waveform::Noise { .. } => self.noise.as_mut().map_or(0.0, NoiseSource::draw),
        };
        self.offset + shape
    }

    /// The next `count` samples at `t0, t0 + period, ...` without disturbing
    /// this generator's own state.
    pub fn preview(&self, t0: Real, period: Real, count: usize) -> Vec<Real> {
        let mut shadow = self.clone();
        (0..count).map(|i| shadow.sample(t0 + i as Real * period)).collect()
    }
}

impl SisoBlock for Generator {
    fn reset(&mut self) {
        self.samples_emitted = 0;
        if let Some(noise) = self.noise.as_mut() {
            noise.reseed();
        }
    }

    /// The input is ignored; generators are driven by time alone.
    fn step(&mut self, _input: Real, t: Real) -> CoreResult<Real> {
        Ok(self.sample(t))
    }
}

/// Position within the current period, in `[0, 1)`.
fn cycle_fraction(elapsed: Real, period: Real, phase_rad: Real) -> Real {
    (elapsed / period + phase_rad / TAU).rem_euclid(1.0)
}

fn check_finite(v: Real, what: &str) -> SignalResult<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(SignalError::invalid(format!("{what} must be finite (got {v})")))
    }
}

fn check_period(period_s: Real) -> SignalResult<()> {
    if period_s.is_finite() && period_s > 0.0 {
        Ok(())
    } else {
        Err(SignalError::invalid(format!(
            "period must be positive and finite (got {period_s})"
        )))
    }
}
