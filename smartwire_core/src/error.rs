use thiserror::Error;

use crate::fault::BusFault;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TunerError {
    #[error("transaction with 0x{address:02x} failed: {fault}")]
    Transaction { address: u8, fault: BusFault },
    #[error("bus timing apply failed: {0}")]
    Apply(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing bus")]
    MissingBus,
    #[error("missing bus timing")]
    MissingTiming,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
