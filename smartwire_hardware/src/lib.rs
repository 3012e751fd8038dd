//! Bus backends for the smartwire controller.
//!
//! - `sim`: deterministic simulated bus whose failure behaviour depends on the
//!   timing parameters currently programmed through its `SimulatedTiming` handle.
//! - `hardware` (feature `hardware`): Linux i2c-dev master via `rppal`.
pub mod error;
pub mod sim;

#[cfg(feature = "hardware")]
pub mod hardware;

pub use error::HwError;
pub use sim::{SimDevice, SimulatedBus, SimulatedTiming};

#[cfg(feature = "hardware")]
pub use hardware::{HardwareBus, HardwareTiming};
