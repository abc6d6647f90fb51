//! ls-core: stable foundation for loopsim.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - ids (compact IDs and the per-run entity registry)
//! - siso (the block contract every generator, plant and regulator satisfies)
//! - history (fixed-depth sample memory for difference equations)
//! - error (shared error types)

pub mod error;
pub mod history;
pub mod ids;
pub mod numeric;
pub mod siso;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use history::SampleHistory;
pub use ids::*;
pub use numeric::*;
pub use siso::{Condition, SisoBlock, replay};
