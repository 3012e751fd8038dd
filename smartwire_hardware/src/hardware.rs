//! Linux i2c-dev master backed by `rppal`.
//!
//! The kernel driver owns the bus clock (device tree / module parameter), so
//! `HardwareTiming` reports no runtime timing capabilities and the controller
//! only tracks its parameters logically on this backend.
use rppal::i2c::I2c;
use smartwire_traits::{BoxError, BusTiming, I2cBus, TimingCaps};

use crate::error::{HwError, Result};

// errno values the i2c-dev driver uses for a missing ACK
const ENXIO: i32 = 6;
const EREMOTEIO: i32 = 121;

pub struct HardwareBus {
    i2c: I2c,
    selected: Option<u8>,
}

impl HardwareBus {
    /// Open `/dev/i2c-<bus>`.
    pub fn open(bus: u8) -> Result<Self> {
        let i2c = I2c::with_bus(bus).map_err(|e| HwError::I2c(format!("open i2c-{bus}: {e}")))?;
        match i2c.clock_speed() {
            Ok(hz) => tracing::info!(bus, clock_hz = hz, "i2c bus opened"),
            Err(e) => tracing::debug!(bus, error = %e, "clock speed unavailable"),
        }
        Ok(HardwareBus {
            i2c,
            selected: None,
        })
    }

    fn select(&mut self, address: u8) -> Result<()> {
        if self.selected != Some(address) {
            self.i2c
                .set_slave_address(u16::from(address))
                .map_err(|e| map_rppal(e, address))?;
            self.selected = Some(address);
        }
        Ok(())
    }
}

fn map_rppal(e: rppal::i2c::Error, address: u8) -> HwError {
    match e {
        rppal::i2c::Error::Io(io) => match io.raw_os_error() {
            Some(ENXIO) | Some(EREMOTEIO) => HwError::AddressNack(address),
            _ if io.kind() == std::io::ErrorKind::TimedOut => HwError::Timeout,
            _ => HwError::Io(io),
        },
        other => HwError::I2c(other.to_string()),
    }
}

impl I2cBus for HardwareBus {
    fn write(&mut self, address: u8, bytes: &[u8]) -> std::result::Result<(), BoxError> {
        self.select(address)?;
        let n = self.i2c.write(bytes).map_err(|e| map_rppal(e, address))?;
        if n < bytes.len() {
            return Err(Box::new(HwError::DataNack(address)));
        }
        Ok(())
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> std::result::Result<usize, BoxError> {
        self.select(address)?;
        Ok(self.i2c.read(buf).map_err(|e| map_rppal(e, address))?)
    }

    fn probe(&mut self, address: u8) -> std::result::Result<bool, BoxError> {
        self.select(address)?;
        match self.i2c.smbus_quick_command(false) {
            Ok(()) => Ok(true),
            Err(e) => match map_rppal(e, address) {
                HwError::AddressNack(_) => Ok(false),
                other => Err(Box::new(other)),
            },
        }
    }
}

/// Timing handle for i2c-dev; the clock is fixed by the kernel/device tree,
/// so neither parameter can be reprogrammed at runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct HardwareTiming;

impl BusTiming for HardwareTiming {
    fn set_clock_hz(&mut self, hz: u32) -> std::result::Result<(), BoxError> {
        tracing::debug!(clock_hz = hz, "i2c-dev clock is fixed; ignoring");
        Ok(())
    }

    fn set_rise_time_ns(&mut self, _ns: u32) -> std::result::Result<(), BoxError> {
        Ok(())
    }

    fn caps(&self) -> TimingCaps {
        TimingCaps::NONE
    }
}
