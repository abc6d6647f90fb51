//! Loop definition schema.
//!
//! ```yaml
//! version: 1
//! name: level-loop
//! period_s: 0.1
//! steps: 100
//! generators:
//!   - name: setpoint
//!     type: step
//!     params: { amplitude: 1.0 }
//! regulator:
//!   name: ctrl
//!   kind: proportional
//!   kp: 2.0
//! plant:
//!   name: tank
//!   type: arx
//!   a: [-0.9]
//!   b: [0.1]
//!   delay: 1
//! ```

use ls_controls::RegulatorSpec;
use ls_signals::GeneratorParams;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoopDef {
    pub version: u32,
    pub name: String,
    pub period_s: f64,
    pub steps: usize,
    #[serde(default)]
    pub generators: Vec<GeneratorDef>,
    pub regulator: RegulatorDef,
    pub plant: PlantDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratorDef {
    pub name: String,
    /// Waveform tag understood by `create_generator`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: GeneratorParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegulatorDef {
    pub name: String,
    #[serde(flatten)]
    pub spec: RegulatorSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlantDef {
    pub name: String,
    #[serde(flatten)]
    pub model: PlantModelDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlantModelDef {
    /// `y[k] = -Σ a_i y[k-i] + Σ b_j u[k-delay-j]`.
    Arx {
        a: Vec<f64>,
        b: Vec<f64>,
        #[serde(default)]
        delay: usize,
        /// Warm-start history, newest first.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        initial_inputs: Vec<f64>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        initial_outputs: Vec<f64>,
    },
    /// `z^-delay · N(z^-1) / D(z^-1)`.
    TransferFunction {
        numerator: Vec<f64>,
        denominator: Vec<f64>,
        #[serde(default)]
        delay: usize,
    },
    Series { stages: Vec<PlantModelDef> },
    Parallel { branches: Vec<PlantModelDef> },
}

impl PlantModelDef {
    pub fn kind(&self) -> &'static str {
        match self {
            PlantModelDef::Arx { .. } => "arx",
            PlantModelDef::TransferFunction { .. } => "transfer_function",
            PlantModelDef::Series { .. } => "series",
            PlantModelDef::Parallel { .. } => "parallel",
        }
    }
}
