pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Boxed error type used at every hardware trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Raw transaction primitives of an I2C master.
///
/// Addresses are 7-bit. Implementations report NACKs and timeouts as errors;
/// the caller classifies them.
pub trait I2cBus {
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BoxError>;
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, BoxError>;
    /// Address-only transfer; `Ok(true)` when a device acknowledged.
    fn probe(&mut self, address: u8) -> Result<bool, BoxError>;
}

/// What a platform can actually program on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingCaps {
    pub clock: bool,
    pub rise_time: bool,
}

impl TimingCaps {
    pub const FULL: Self = Self {
        clock: true,
        rise_time: true,
    };
    pub const CLOCK_ONLY: Self = Self {
        clock: true,
        rise_time: false,
    };
    pub const NONE: Self = Self {
        clock: false,
        rise_time: false,
    };
}

/// Hardware apply primitive for bus timing parameters.
pub trait BusTiming {
    fn set_clock_hz(&mut self, hz: u32) -> Result<(), BoxError>;
    /// Best-effort; only called when `caps().rise_time` is true.
    fn set_rise_time_ns(&mut self, ns: u32) -> Result<(), BoxError>;
    fn caps(&self) -> TimingCaps {
        TimingCaps::CLOCK_ONLY
    }
}

impl<B: I2cBus + ?Sized> I2cBus for Box<B> {
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BoxError> {
        (**self).write(address, bytes)
    }
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, BoxError> {
        (**self).read(address, buf)
    }
    fn probe(&mut self, address: u8) -> Result<bool, BoxError> {
        (**self).probe(address)
    }
}

impl<T: BusTiming + ?Sized> BusTiming for Box<T> {
    fn set_clock_hz(&mut self, hz: u32) -> Result<(), BoxError> {
        (**self).set_clock_hz(hz)
    }
    fn set_rise_time_ns(&mut self, ns: u32) -> Result<(), BoxError> {
        (**self).set_rise_time_ns(ns)
    }
    fn caps(&self) -> TimingCaps {
        (**self).caps()
    }
}
