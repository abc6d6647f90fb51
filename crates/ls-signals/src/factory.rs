//! Generator factory: type tag + parameter set -> [`Generator`].

use core::fmt;
use core::str::FromStr;

use ls_core::Real;
use serde::{Deserialize, Serialize};

use crate::error::{SignalError, SignalResult};
use crate::generator::{Generator, NoiseDistribution, Waveform};

/// Generator families known to the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratorKind {
    Step,
    Pulse,
    Sine,
    Square,
    Triangle,
    Noise,
}

impl GeneratorKind {
    pub const ALL: [GeneratorKind; 6] = [
        GeneratorKind::Step,
        GeneratorKind::Pulse,
        GeneratorKind::Sine,
        GeneratorKind::Square,
        GeneratorKind::Triangle,
        GeneratorKind::Noise,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            GeneratorKind::Step => "step",
            GeneratorKind::Pulse => "pulse",
            GeneratorKind::Sine => "sine",
            GeneratorKind::Square => "square",
            GeneratorKind::Triangle => "triangle",
            GeneratorKind::Noise => "noise",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for GeneratorKind {
    type Err = SignalError;

    /// Tags are case-insensitive; `sin` is accepted for `sine`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "step" => Ok(GeneratorKind::Step),
            "pulse" => Ok(GeneratorKind::Pulse),
            "sine" | "sin" => Ok(GeneratorKind::Sine),
            "square" => Ok(GeneratorKind::Square),
            "triangle" => Ok(GeneratorKind::Triangle),
            "noise" => Ok(GeneratorKind::Noise),
            _ => Err(SignalError::UnknownGeneratorType { tag: s.to_string() }),
        }
    }
}

/// Parameters shared by every generator family. Fields a family does not use
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorParams {
    /// Peak deviation from `offset`; standard deviation for gaussian noise. Default 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amplitude: Option<f64>,
    /// Default 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    /// Period of periodic waveforms. Exclusive with `frequency_hz`. Default 1 s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_hz: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_rad: Option<f64>,
    /// High fraction of a pulse/square period in `[0, 1]`. Default 0.5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duty_cycle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_time_s: Option<f64>,
    /// Output holds `offset` until this time. Default 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<NoiseDistribution>,
}

impl GeneratorParams {
    /// Resolve `period_s` / `frequency_hz` into a period.
    pub fn period(&self) -> SignalResult<Real> {
        match (self.period_s, self.frequency_hz) {
            (Some(_), Some(_)) => Err(SignalError::invalid(
                "give either period_s or frequency_hz, not both",
            )),
            (Some(p), None) => Ok(p),
            (None, Some(f)) if f.is_finite() && f > 0.0 => Ok(1.0 / f),
            (None, Some(f)) => Err(SignalError::invalid(format!(
                "frequency_hz must be positive and finite (got {f})"
            ))),
            (None, None) => Ok(1.0),
        }
    }

    fn phase(&self) -> Real {
        self.phase_rad.unwrap_or(0.0)
    }

    fn duty(&self) -> Real {
        self.duty_cycle.unwrap_or(0.5)
    }
}

/// Build a generator from its type tag and parameters.
pub fn create_generator(tag: &str, params: &GeneratorParams) -> SignalResult<Generator> {
    let kind: GeneratorKind = tag.parse()?;
    build(kind, params)
}

fn build(kind: GeneratorKind, params: &GeneratorParams) -> SignalResult<Generator> {
    let waveform = match kind {
        GeneratorKind::Step => Waveform::Step {
            step_time_s: params.step_time_s.unwrap_or(0.0),
        },
        GeneratorKind::Pulse => Waveform::Pulse {
            period_s: params.period()?,
            duty: params.duty(),
            phase_rad: params.phase(),
        },
        GeneratorKind::Sine => Waveform::Sine {
            period_s: params.period()?,
            phase_rad: params.phase(),
        },
        GeneratorKind::Square => Waveform::Square {
            period_s: params.period()?,
            duty: params.duty(),
            phase_rad: params.phase(),
        },
        GeneratorKind::Triangle => Waveform::Triangle {
            period_s: params.period()?,
            phase_rad: params.phase(),
        },
        GeneratorKind::Noise => Waveform::Noise {
            distribution: params.distribution.unwrap_or_default(),
            seed: params.seed.unwrap_or(0),
        },
    };
    Generator::new(
        waveform,
        params.amplitude.unwrap_or(1.0),
        params.offset.unwrap_or(0.0),
        params.start_s.unwrap_or(0.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_parse_case_insensitively() {
        assert_eq!("Sine".parse::<GeneratorKind>().unwrap(), GeneratorKind::Sine);
        assert_eq!("sin".parse::<GeneratorKind>().unwrap(), GeneratorKind::Sine);
        assert_eq!(" NOISE ".parse::<GeneratorKind>().unwrap(), GeneratorKind::Noise);
        for kind in GeneratorKind::ALL {
            assert_eq!(kind.tag().parse::<GeneratorKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = create_generator("sawtooth", &GeneratorParams::default()).unwrap_err();
        assert_eq!(
            err,
            SignalError::UnknownGeneratorType {
                tag: "sawtooth".to_string()
            }
        );
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let mut g = create_generator("step", &GeneratorParams::default()).unwrap();
        assert_eq!(g.amplitude(), 1.0);
        assert_eq!(g.sample(0.0), 1.0);
    }

    #[test]
    fn frequency_converts_to_period() {
        let params = GeneratorParams {
            frequency_hz: Some(4.0),
            ..Default::default()
        };
        assert_eq!(params.period().unwrap(), 0.25);
        let g = create_generator("sine", &params).unwrap();
        assert_eq!(
            g.waveform(),
            &Waveform::Sine {
                period_s: 0.25,
                phase_rad: 0.0
            }
        );
    }

    #[test]
    fn period_and_frequency_together_is_invalid() {
        let params = GeneratorParams {
            period_s: Some(1.0),
            frequency_hz: Some(1.0),
            ..Default::default()
        };
        assert!(matches!(
            create_generator("square", &params),
            Err(SignalError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn phase_shifts_sine() {
        let params = GeneratorParams {
            phase_rad: Some(std::f64::consts::FRAC_PI_2),
            ..Default::default()
        };
        let mut g = create_generator("sine", &params).unwrap();
        assert!((g.sample(0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn params_parse_from_yaml() {
        let params: GeneratorParams = serde_yaml::from_str(
            "amplitude: 0.5\nperiod_s: 2.0\nduty_cycle: 0.2\ndistribution: gaussian\n",
        )
        .unwrap();
        assert_eq!(params.amplitude, Some(0.5));
        assert_eq!(params.distribution, Some(NoiseDistribution::Gaussian));
        assert_eq!(params.offset, None);
    }
}
