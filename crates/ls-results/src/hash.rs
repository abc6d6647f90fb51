//! Content-based hashing for run IDs.

use ls_project::LoopDef;
use sha2::{Digest, Sha256};

pub fn compute_run_id(def: &LoopDef, kernel_version: &str) -> String {
    let mut hasher = Sha256::new();

    let def_json = serde_json::to_string(def).unwrap_or_default();
    hasher.update(def_json.as_bytes());

    hasher.update(kernel_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
