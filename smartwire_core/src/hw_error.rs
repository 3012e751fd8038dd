//! Maps `Box<dyn Error>` from trait boundaries to a `BusFault`.
//!
//! The traits in `smartwire_traits` use `Box<dyn Error + Send + Sync>` for maximum
//! flexibility; this module converts those to the fault taxonomy, with an
//! optional feature-gated path for `smartwire_hardware::HwError` downcasting.

use crate::fault::BusFault;

/// Classify a trait-boundary error.
///
/// Attempts to downcast known error types first, then falls back
/// to string-based heuristics.
pub fn classify(e: &(dyn std::error::Error + 'static)) -> BusFault {
    if let Some(fault) = e.downcast_ref::<BusFault>() {
        return match fault {
            BusFault::None => BusFault::Other,
            f => *f,
        };
    }

    // Feature-gated: try to downcast to HwError for precise mapping
    #[cfg(feature = "hardware-errors")]
    {
        use smartwire_hardware::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => BusFault::Timeout,
                HwError::AddressNack(_) => BusFault::AddressNack,
                HwError::DataNack(_) => BusFault::DataNack,
                HwError::I2c(_) | HwError::Io(_) => BusFault::Other,
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string().to_lowercase();
    if s.contains("timeout") || s.contains("timed out") {
        BusFault::Timeout
    } else if s.contains("nack") || s.contains("not acknowledged") {
        if s.contains("data") {
            BusFault::DataNack
        } else {
            BusFault::AddressNack
        }
    } else {
        BusFault::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_fault_passes_through() {
        let e: Box<dyn std::error::Error + Send + Sync> = Box::new(BusFault::DataNack);
        assert_eq!(classify(&*e), BusFault::DataNack);
    }

    #[test]
    fn string_heuristics() {
        let e = std::io::Error::other("operation timed out");
        assert_eq!(classify(&e), BusFault::Timeout);
        let e = std::io::Error::other("data NACK from device");
        assert_eq!(classify(&e), BusFault::DataNack);
        let e = std::io::Error::other("address NACK");
        assert_eq!(classify(&e), BusFault::AddressNack);
        let e = std::io::Error::other("arbitration lost");
        assert_eq!(classify(&e), BusFault::Other);
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hardware_errors_are_downcast() {
        use smartwire_hardware::HwError;
        let e: Box<dyn std::error::Error + Send + Sync> = Box::new(HwError::AddressNack(0x48));
        assert_eq!(classify(&*e), BusFault::AddressNack);
        let e: Box<dyn std::error::Error + Send + Sync> = Box::new(HwError::DataNack(0x48));
        assert_eq!(classify(&*e), BusFault::DataNack);
        let e: Box<dyn std::error::Error + Send + Sync> = Box::new(HwError::Timeout);
        assert_eq!(classify(&*e), BusFault::Timeout);
    }
}
