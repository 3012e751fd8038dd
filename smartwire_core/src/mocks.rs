//! Test and helper mocks for smartwire_core
//!
//! All handles are cheap clones sharing state, so a test can keep one copy
//! while the tuner owns the other.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use smartwire_traits::{BoxError, BusTiming, Clock, I2cBus, TimingCaps};

use crate::fault::BusFault;

/// Clock that only moves when told to; `sleep` advances it.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off += d;
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Time advanced since construction.
    pub fn elapsed(&self) -> Duration {
        self.offset.lock().map(|off| *off).unwrap_or_default()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[derive(Debug, Default)]
struct Script {
    outcomes: VecDeque<BusFault>,
    present: Vec<u8>,
    transactions: u32,
}

/// Bus whose transaction outcomes are queued by the test.
///
/// Each `write`/`read` pops one outcome (`BusFault::None` = success, empty
/// queue = success) and advances the optional clock by the configured latency.
/// `probe` acknowledges addresses listed as present unless a fault is queued.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBus {
    script: Rc<RefCell<Script>>,
    clock: Option<ManualClock>,
    latency: Duration,
}

impl ScriptedBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance `clock` by `latency` on every transaction.
    pub fn with_latency(clock: ManualClock, latency: Duration) -> Self {
        Self {
            clock: Some(clock),
            latency,
            ..Self::default()
        }
    }

    pub fn with_devices(self, addresses: &[u8]) -> Self {
        self.script.borrow_mut().present.extend_from_slice(addresses);
        self
    }

    /// Queue `n` outcomes of `fault`.
    pub fn push(&self, fault: BusFault, n: usize) {
        let mut s = self.script.borrow_mut();
        s.outcomes.extend(std::iter::repeat_n(fault, n));
    }

    pub fn transactions(&self) -> u32 {
        self.script.borrow().transactions
    }

    fn next(&self) -> BusFault {
        let mut s = self.script.borrow_mut();
        s.transactions = s.transactions.saturating_add(1);
        let f = s.outcomes.pop_front().unwrap_or_default();
        drop(s);
        if let Some(c) = &self.clock {
            c.advance(self.latency);
        }
        f
    }
}

impl I2cBus for ScriptedBus {
    fn write(&mut self, _address: u8, _bytes: &[u8]) -> Result<(), BoxError> {
        match self.next() {
            BusFault::None => Ok(()),
            f => Err(Box::new(f)),
        }
    }

    fn read(&mut self, _address: u8, buf: &mut [u8]) -> Result<usize, BoxError> {
        match self.next() {
            BusFault::None => {
                buf.fill(0);
                Ok(buf.len())
            }
            f => Err(Box::new(f)),
        }
    }

    fn probe(&mut self, address: u8) -> Result<bool, BoxError> {
        match self.next() {
            BusFault::None => Ok(self.script.borrow().present.contains(&address)),
            BusFault::AddressNack => Ok(false),
            f => Err(Box::new(f)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingEvent {
    Clock(u32),
    Rise(u32),
}

/// Timing sink that records every push.
#[derive(Debug, Clone)]
pub struct RecordingTiming {
    events: Rc<RefCell<Vec<TimingEvent>>>,
    failures: Rc<Cell<u32>>,
    caps: TimingCaps,
}

impl Default for RecordingTiming {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTiming {
    pub fn new() -> Self {
        Self::with_caps(TimingCaps::FULL)
    }

    pub fn with_caps(caps: TimingCaps) -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
            failures: Rc::new(Cell::new(0)),
            caps,
        }
    }

    /// Make the next `n` clock pushes fail.
    pub fn fail_next(&self, n: u32) {
        self.failures.set(n);
    }

    pub fn events(&self) -> Vec<TimingEvent> {
        self.events.borrow().clone()
    }

    pub fn last_clock(&self) -> Option<u32> {
        self.events.borrow().iter().rev().find_map(|e| match e {
            TimingEvent::Clock(hz) => Some(*hz),
            TimingEvent::Rise(_) => None,
        })
    }

    pub fn last_rise(&self) -> Option<u32> {
        self.events.borrow().iter().rev().find_map(|e| match e {
            TimingEvent::Rise(ns) => Some(*ns),
            TimingEvent::Clock(_) => None,
        })
    }
}

impl BusTiming for RecordingTiming {
    fn set_clock_hz(&mut self, hz: u32) -> Result<(), BoxError> {
        let pending = self.failures.get();
        if pending > 0 {
            self.failures.set(pending - 1);
            return Err(Box::new(std::io::Error::other("clock rejected")));
        }
        self.events.borrow_mut().push(TimingEvent::Clock(hz));
        Ok(())
    }

    fn set_rise_time_ns(&mut self, ns: u32) -> Result<(), BoxError> {
        self.events.borrow_mut().push(TimingEvent::Rise(ns));
        Ok(())
    }

    fn caps(&self) -> TimingCaps {
        self.caps
    }
}
