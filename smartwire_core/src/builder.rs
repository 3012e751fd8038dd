//! Type-state builder for `Tuner` and generic `build_tuner` constructor.
//!
//! The builder enforces at compile time that a bus and a timing sink are
//! provided before `build()` is available. `try_build()` is always available
//! for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use smartwire_traits::{BusTiming, Clock, I2cBus, MonotonicClock};

use crate::config::{LearningCfg, RangeCfg, TunerSettings};
use crate::error::{BuildError, Result};
use crate::tuner::TunerCore;

/// Dynamic (boxed) tuner, as built by `TunerBuilder`.
pub type Tuner = TunerCore<Box<dyn I2cBus>, Box<dyn BusTiming>>;

/// Generic, statically-dispatched alias using the unified core.
pub type TunerG<B, T> = TunerCore<B, T>;

impl Tuner {
    /// Start building a Tuner.
    pub fn builder() -> TunerBuilder<Missing, Missing> {
        TunerBuilder::default()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Tuner`. All fields are validated on `build()`.
pub struct TunerBuilder<B, T> {
    bus: Option<Box<dyn I2cBus>>,
    timing: Option<Box<dyn BusTiming>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    settings: TunerSettings,
    overrides: Vec<(u8, u32, u32)>,
    _b: PhantomData<B>,
    _t: PhantomData<T>,
}

impl Default for TunerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            bus: None,
            timing: None,
            clock: None,
            settings: TunerSettings::default(),
            overrides: Vec::new(),
            _b: PhantomData,
            _t: PhantomData,
        }
    }
}

/// Validate settings and construct a `TunerCore`.
///
/// This is the single source of truth for validation and construction,
/// used by both `TunerBuilder::try_build()` and `build_tuner()`.
fn validate_and_build<B: I2cBus, T: BusTiming>(
    bus: B,
    timing: T,
    settings: TunerSettings,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    overrides: &[(u8, u32, u32)],
) -> Result<TunerCore<B, T>> {
    // ── Validation ───────────────────────────────────────────────────────────
    if !settings.clock_range.is_valid() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "clock range must span at least one unit per step and contain its default",
        )));
    }
    if !settings.rise_range.is_valid() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "rise range must span at least one unit per step and contain its default",
        )));
    }
    let l = &settings.learning;
    if !(1..=10).contains(&l.adaptation_rate) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "adaptation_rate must be in 1..=10",
        )));
    }
    if l.error_threshold == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "error_threshold must be >= 1",
        )));
    }
    if l.sample_interval == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "sample_interval must be >= 1",
        )));
    }
    if settings.scan_first == 0 || settings.scan_first > settings.scan_last || settings.scan_last > 0x7F {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "scan span must be a non-empty 7-bit range starting at 0x01 or above",
        )));
    }

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };

    let mut core = TunerCore::assemble(bus, timing, clock, settings);
    for &(address, clock_hz, rise_ns) in overrides {
        core.set_device_config(address, clock_hz, rise_ns);
    }
    Ok(core)
}

impl<B, T> TunerBuilder<B, T> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Tuner> {
        let bus = self
            .bus
            .ok_or_else(|| eyre::Report::new(BuildError::MissingBus))?;
        let timing = self
            .timing
            .ok_or_else(|| eyre::Report::new(BuildError::MissingTiming))?;
        validate_and_build(bus, timing, self.settings, self.clock, &self.overrides)
    }
}

/// Chainable setters that do not affect type-state.
impl<B, T> TunerBuilder<B, T> {
    pub fn with_clock_range(mut self, range: RangeCfg) -> Self {
        self.settings.clock_range = range;
        self
    }
    pub fn with_rise_range(mut self, range: RangeCfg) -> Self {
        self.settings.rise_range = range;
        self
    }
    pub fn with_learning(mut self, learning: LearningCfg) -> Self {
        self.settings.learning = learning;
        self
    }
    pub fn with_scan_span(mut self, first: u8, last: u8) -> Self {
        self.settings.scan_first = first;
        self.settings.scan_last = last;
        self
    }
    /// Replace all settings at once, e.g. from a loaded config file.
    pub fn with_settings(mut self, settings: TunerSettings) -> Self {
        self.settings = settings;
        self
    }
    /// Queue a per-device override installed right after construction.
    pub fn with_device_override(mut self, address: u8, clock_hz: u32, rise_ns: u32) -> Self {
        self.overrides.push((address, clock_hz, rise_ns));
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<T> TunerBuilder<Missing, T> {
    pub fn with_bus(self, bus: impl I2cBus + 'static) -> TunerBuilder<Set, T> {
        TunerBuilder {
            bus: Some(Box::new(bus)),
            timing: self.timing,
            clock: self.clock,
            settings: self.settings,
            overrides: self.overrides,
            _b: PhantomData,
            _t: PhantomData,
        }
    }
}

impl<B> TunerBuilder<B, Missing> {
    pub fn with_timing(self, timing: impl BusTiming + 'static) -> TunerBuilder<B, Set> {
        TunerBuilder {
            bus: self.bus,
            timing: Some(Box::new(timing)),
            clock: self.clock,
            settings: self.settings,
            overrides: self.overrides,
            _b: PhantomData,
            _t: PhantomData,
        }
    }
}

impl TunerBuilder<Set, Set> {
    /// Validate and build the Tuner. Only available when bus and timing are set.
    pub fn build(self) -> Result<Tuner> {
        self.try_build()
    }
}

/// Build a generic, statically-dispatched `TunerG` from concrete bus and timing.
///
/// Delegates to the shared `validate_and_build`; no duplicated validation logic.
pub fn build_tuner<B, T>(
    bus: B,
    timing: T,
    settings: TunerSettings,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<TunerG<B, T>>
where
    B: I2cBus + 'static,
    T: BusTiming + 'static,
{
    validate_and_build(bus, timing, settings, clock, &[])
}
