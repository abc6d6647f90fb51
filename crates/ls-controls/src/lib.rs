//! Feedback regulators for loopsim.
//!
//! Every regulator is a SISO block whose input is the measured plant output.
//! The setpoint trajectory is handed over by the loop before each step.
//!
//! - **P**: proportional action only
//! - **PID**: integral clamping, conditional-integration anti-windup and a
//!   filtered derivative
//! - **GPC**: receding-horizon predictive control on a model identified online

pub mod error;
pub mod gpc;
pub mod pid;
pub mod proportional;
pub mod regulator;

pub use error::{ControlError, ControlResult};
pub use gpc::{GPCConfig, GPCRegulator};
pub use pid::{PIDController, PIDControllerState, PIDRegulator};
pub use proportional::PRegulator;
pub use regulator::{Regulator, RegulatorSpec, create_regulator};
