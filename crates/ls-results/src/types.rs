//! Result data types.

use ls_core::Condition;
use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub loop_name: String,
    /// RFC 3339 creation time.
    pub timestamp: String,
    pub period_s: f64,
    pub steps: usize,
    pub kernel_version: String,
}

impl RunManifest {
    pub fn new(def: &ls_project::LoopDef, kernel_version: &str) -> Self {
        Self {
            run_id: crate::compute_run_id(def, kernel_version),
            loop_name: def.name.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            period_s: def.period_s,
            steps: def.steps,
            kernel_version: kernel_version.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time_s: f64,
    pub value: f64,
}

/// A recoverable condition raised by a named block during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningRecord {
    pub time_s: f64,
    pub source: String,
    pub condition: Condition,
}
