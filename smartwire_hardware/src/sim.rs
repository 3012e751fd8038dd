use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use smartwire_traits::{BoxError, BusTiming, Clock, I2cBus, TimingCaps};

use crate::error::HwError;

/// Timing state before anything has been programmed (Wire.h defaults).
pub const POWER_ON_CLOCK_HZ: u32 = 100_000;
pub const POWER_ON_RISE_NS: u32 = 125;

/// Bits on the wire per byte, including the ACK slot.
const BITS_PER_BYTE: u64 = 9;

/// One simulated target on the bus.
#[derive(Debug, Clone)]
pub struct SimDevice {
    pub address: u8,
    /// Fastest clock the device tolerates; above it data bytes are NACKed.
    pub max_clock_hz: u32,
    /// Shortest rise time the wiring tolerates; below it transfers are corrupted.
    pub min_rise_ns: u32,
    /// Fixed per-transaction overhead added to the wire time.
    pub base_latency_us: u64,
}

impl SimDevice {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            max_clock_hz: 400_000,
            min_rise_ns: 40,
            base_latency_us: 50,
        }
    }

    pub fn with_max_clock_hz(mut self, hz: u32) -> Self {
        self.max_clock_hz = hz;
        self
    }

    pub fn with_min_rise_ns(mut self, ns: u32) -> Self {
        self.min_rise_ns = ns;
        self
    }

    pub fn with_base_latency_us(mut self, us: u64) -> Self {
        self.base_latency_us = us;
        self
    }
}

#[derive(Debug)]
struct SimState {
    clock_hz: Cell<u32>,
    rise_ns: Cell<u32>,
    applies: Cell<u32>,
    forced_failures: Cell<u32>,
    transactions: Cell<u64>,
}

/// Simulated I2C master.
///
/// Each transfer advances the injected clock by its modelled wire time, so a
/// manual clock in tests sees realistic elapsed times without sleeping.
pub struct SimulatedBus {
    devices: Vec<SimDevice>,
    state: Rc<SimState>,
    clock: Arc<dyn Clock + Send + Sync>,
    // Scratch register contents returned by reads, per address
    registers: RefCell<Vec<(u8, Vec<u8>)>>,
}

impl SimulatedBus {
    pub fn new(devices: Vec<SimDevice>, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        SimulatedBus {
            devices,
            state: Rc::new(SimState {
                clock_hz: Cell::new(POWER_ON_CLOCK_HZ),
                rise_ns: Cell::new(POWER_ON_RISE_NS),
                applies: Cell::new(0),
                forced_failures: Cell::new(0),
                transactions: Cell::new(0),
            }),
            clock,
            registers: RefCell::new(Vec::new()),
        }
    }

    /// Handle that programs this bus's timing; shares state with the bus.
    pub fn timing(&self) -> SimulatedTiming {
        SimulatedTiming {
            state: Rc::clone(&self.state),
        }
    }

    /// Force the next `n` transfers to fail with a timeout regardless of timing.
    pub fn fail_next(&self, n: u32) {
        self.state.forced_failures.set(n);
    }

    /// Currently programmed (clock_hz, rise_ns).
    pub fn timing_state(&self) -> (u32, u32) {
        (self.state.clock_hz.get(), self.state.rise_ns.get())
    }

    pub fn transactions(&self) -> u64 {
        self.state.transactions.get()
    }

    fn wire_time(&self, dev: &SimDevice, bytes: usize) -> Duration {
        let bits = BITS_PER_BYTE * (1 + bytes as u64);
        let hz = u64::from(self.state.clock_hz.get().max(1));
        let wire_us = (bits * 1_000_000).div_ceil(hz);
        Duration::from_micros(dev.base_latency_us + wire_us)
    }

    fn transfer(&self, address: u8, bytes: usize) -> Result<(), HwError> {
        self.state
            .transactions
            .set(self.state.transactions.get().saturating_add(1));
        let forced = self.state.forced_failures.get();
        if forced > 0 {
            self.state.forced_failures.set(forced - 1);
            self.clock.sleep(Duration::from_micros(1_000));
            return Err(HwError::Timeout);
        }
        let Some(dev) = self.devices.iter().find(|d| d.address == address) else {
            // Address phase only: one byte on the wire
            let hz = u64::from(self.state.clock_hz.get().max(1));
            self.clock
                .sleep(Duration::from_micros((BITS_PER_BYTE * 1_000_000).div_ceil(hz)));
            return Err(HwError::AddressNack(address));
        };
        self.clock.sleep(self.wire_time(dev, bytes));
        if self.state.clock_hz.get() > dev.max_clock_hz {
            tracing::trace!(
                address,
                clock_hz = self.state.clock_hz.get(),
                max_clock_hz = dev.max_clock_hz,
                "sim: clock too fast"
            );
            return Err(HwError::DataNack(address));
        }
        if self.state.rise_ns.get() < dev.min_rise_ns {
            return Err(HwError::I2c(format!(
                "signal integrity: rise {}ns < {}ns",
                self.state.rise_ns.get(),
                dev.min_rise_ns
            )));
        }
        Ok(())
    }
}

impl I2cBus for SimulatedBus {
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BoxError> {
        self.transfer(address, bytes.len())?;
        let mut regs = self.registers.borrow_mut();
        match regs.iter_mut().find(|(a, _)| *a == address) {
            Some((_, data)) => {
                data.clear();
                data.extend_from_slice(bytes);
            }
            None => regs.push((address, bytes.to_vec())),
        }
        Ok(())
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, BoxError> {
        self.transfer(address, buf.len())?;
        let regs = self.registers.borrow();
        let data = regs
            .iter()
            .find(|(a, _)| *a == address)
            .map(|(_, d)| d.as_slice())
            .unwrap_or(&[]);
        for (i, b) in buf.iter_mut().enumerate() {
            *b = data.get(i).copied().unwrap_or(address);
        }
        Ok(buf.len())
    }

    fn probe(&mut self, address: u8) -> Result<bool, BoxError> {
        match self.transfer(address, 0) {
            Ok(()) => Ok(true),
            Err(HwError::AddressNack(_)) => Ok(false),
            Err(e) => Err(Box::new(e)),
        }
    }
}

/// Timing handle for a `SimulatedBus`; supports both clock and rise time.
#[derive(Debug, Clone)]
pub struct SimulatedTiming {
    state: Rc<SimState>,
}

impl SimulatedTiming {
    /// Number of parameter pushes received so far.
    pub fn applies(&self) -> u32 {
        self.state.applies.get()
    }

    /// Currently programmed (clock_hz, rise_ns).
    pub fn current(&self) -> (u32, u32) {
        (self.state.clock_hz.get(), self.state.rise_ns.get())
    }

    /// Same as `SimulatedBus::fail_next`, usable after the bus has been moved.
    pub fn fail_next(&self, n: u32) {
        self.state.forced_failures.set(n);
    }
}

impl BusTiming for SimulatedTiming {
    fn set_clock_hz(&mut self, hz: u32) -> Result<(), BoxError> {
        if hz == 0 {
            return Err(Box::new(HwError::I2c("clock of 0 Hz".into())));
        }
        self.state.clock_hz.set(hz);
        self.state.applies.set(self.state.applies.get().saturating_add(1));
        Ok(())
    }

    fn set_rise_time_ns(&mut self, ns: u32) -> Result<(), BoxError> {
        self.state.rise_ns.set(ns);
        Ok(())
    }

    fn caps(&self) -> TimingCaps {
        TimingCaps::FULL
    }
}
