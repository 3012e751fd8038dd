//! Classification of completed bus transactions.

use thiserror::Error;

/// Why a transaction failed; `None` marks a successful slot in the error history.
///
/// Implements `Error` so bus implementations can return it directly and have
/// it classified without string matching.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusFault {
    #[default]
    #[error("no error")]
    None,
    #[error("timeout")]
    Timeout,
    #[error("NACK on address")]
    AddressNack,
    #[error("NACK on data")]
    DataNack,
    #[error("other error")]
    Other,
}

impl BusFault {
    /// Classify an Arduino `Wire.endTransmission()`-style status code.
    ///
    /// 0 = success, 1 = data too long (reported as timeout by this taxonomy),
    /// 2 = address NACK, 3 = data NACK, 4 = other, 5 = bus timeout.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => BusFault::None,
            1 | 5 => BusFault::Timeout,
            2 => BusFault::AddressNack,
            3 => BusFault::DataNack,
            _ => BusFault::Other,
        }
    }

    pub fn is_fault(self) -> bool {
        self != BusFault::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BusFault::None => "No error",
            BusFault::Timeout => "Timeout",
            BusFault::AddressNack => "NACK on address",
            BusFault::DataNack => "NACK on data",
            BusFault::Other => "Other error",
        }
    }
}

/// Result of one completed transaction as reported to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(BusFault),
}

impl Outcome {
    /// Map a raw status code; 0 is success.
    pub fn from_code(code: u8) -> Self {
        match BusFault::from_code(code) {
            BusFault::None => Outcome::Success,
            fault => Outcome::Failure(fault),
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Fault recorded in the error history; a failure never records `None`.
    pub fn fault(self) -> BusFault {
        match self {
            Outcome::Success => BusFault::None,
            Outcome::Failure(BusFault::None) => BusFault::Other,
            Outcome::Failure(f) => f,
        }
    }
}
