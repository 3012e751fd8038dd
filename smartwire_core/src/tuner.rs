//! The self-tuning bus controller (`TunerCore`).
//!
//! Owns the two dynamic ranges, the current and best configurations, the
//! histories and the device registry. Every completed transaction is reported
//! through `observe`; every `sample_interval` successes of an epoch the
//! decision engine runs, and `error_threshold` consecutive failures divert
//! into the recovery tiers instead.

use std::sync::Arc;
use std::time::{Duration, Instant};

use smartwire_traits::{BusTiming, Clock, I2cBus};

use crate::applier::Applier;
use crate::bus_config::BusConfig;
use crate::config::{LearningCfg, RANGE_STEPS, TunerSettings};
use crate::decision::{BestAction, Decision, DecisionInputs, apply_delta, decide};
use crate::error::{Result, TunerError};
use crate::fault::{BusFault, Outcome};
use crate::history::{ErrorHistory, History, Snapshot};
use crate::hw_error::classify;
use crate::metrics::{PerformanceMetrics, score};
use crate::range::DynamicRange;
use crate::recovery::{self, RecoveryState};
use crate::registry::{DeviceEntry, DeviceRegistry};

/// Score a device gets before anything is known about it.
pub const UNKNOWN_DEVICE_COMPATIBILITY: f32 = 50.0;
/// Probe failures tolerated while testing a candidate configuration.
pub const MAX_TEST_ERRORS: u32 = 2;

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    pub clock_hz: u32,
    pub rise_ns: u32,
    pub clock_step: u8,
    pub rise_step: u8,
    pub score: f32,
    pub best_score: f32,
    pub trend: f32,
    pub stability: f32,
    pub recent_error_rate: f32,
    pub metrics: PerformanceMetrics,
    pub consecutive_errors: u8,
    pub learning: bool,
    pub adaptive: bool,
    pub emergency_recovery: bool,
    pub adaptation_rate: u8,
    pub cooldown_ms: u64,
    pub recovery_state: RecoveryState,
    pub last_fault: BusFault,
    pub devices: usize,
    pub last_decision: Option<Decision>,
}

/// Result of a full `scan_and_optimize` sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepReport {
    pub devices: usize,
    pub tested: u32,
    pub passed: u32,
    pub clock_hz: u32,
    pub rise_ns: u32,
    pub score: f32,
}

/// Unified core for both dynamic (boxed) and generic (static dispatch) variants.
pub struct TunerCore<B: I2cBus, T: BusTiming> {
    pub(crate) bus: B,
    pub(crate) applier: Applier<T>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
    pub(crate) settings: TunerSettings,

    pub(crate) clock_range: DynamicRange,
    pub(crate) rise_range: DynamicRange,
    pub(crate) current: BusConfig,
    pub(crate) best: BusConfig,
    pub(crate) history: History,
    pub(crate) errors: ErrorHistory,
    pub(crate) registry: DeviceRegistry,

    pub(crate) consecutive_errors: u8,
    pub(crate) last_adjustment_ms: Option<u64>,
    pub(crate) cooldown_ms: u64,
    pub(crate) last_error_ms: Option<u64>,
    pub(crate) learning: bool,
    pub(crate) adaptive: bool,
    pub(crate) emergency_recovery: bool,
    pub(crate) adaptation_rate: u8,
    pub(crate) last_fault: BusFault,
    pub(crate) recovery_state: RecoveryState,
    pub(crate) score: f32,
    pub(crate) trend: f32,
    pub(crate) last_decision: Option<Decision>,
}

impl<B: I2cBus, T: BusTiming> core::fmt::Debug for TunerCore<B, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TunerCore")
            .field("clock_hz", &self.current.clock_hz)
            .field("rise_ns", &self.current.rise_ns)
            .field("score", &self.score)
            .field("recovery_state", &self.recovery_state)
            .finish()
    }
}

impl<B: I2cBus, T: BusTiming> TunerCore<B, T> {
    /// Assemble a controller from validated settings. Hardware is untouched
    /// until `begin`.
    pub(crate) fn assemble(
        bus: B,
        timing: T,
        clock: Arc<dyn Clock + Send + Sync>,
        settings: TunerSettings,
    ) -> Self {
        let epoch = clock.now();
        let clock_range = DynamicRange::new(settings.clock_range);
        let rise_range = DynamicRange::new(settings.rise_range);
        let current = BusConfig::from_ranges(&clock_range, &rise_range, 0);
        let learning = settings.learning.clone();
        Self {
            bus,
            applier: Applier::new(timing),
            clock,
            epoch,
            clock_range,
            rise_range,
            current,
            best: current,
            history: History::new(),
            errors: ErrorHistory::default(),
            registry: DeviceRegistry::new(),
            consecutive_errors: 0,
            last_adjustment_ms: None,
            cooldown_ms: learning.cooldown_ms,
            last_error_ms: None,
            learning: learning.enabled,
            adaptive: learning.adaptive,
            emergency_recovery: learning.emergency_recovery,
            adaptation_rate: learning.adaptation_rate,
            last_fault: BusFault::None,
            recovery_state: RecoveryState::Normal,
            score: 0.0,
            trend: 0.0,
            last_decision: None,
            settings,
        }
    }

    fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    fn learning_cfg(&self) -> &LearningCfg {
        &self.settings.learning
    }

    // ── Transactions ─────────────────────────────────────────────────────────

    /// Push the initial configuration to the hardware and stamp the metrics.
    pub fn begin(&mut self) {
        let now = self.now_ms();
        self.current.metrics.last_update_ms = now;
        self.push_to_hardware();
        tracing::info!(
            clock_hz = self.current.clock_hz,
            rise_ns = self.current.rise_ns,
            "bus tuner started"
        );
    }

    /// Write `bytes` to `address`, accounting the transaction.
    pub fn write(&mut self, address: u8, bytes: &[u8]) -> Result<()> {
        self.prepare(address);
        let start = self.clock.now();
        let res = self.bus.write(address, bytes);
        let elapsed = self.clock.now().saturating_duration_since(start);
        match res {
            Ok(()) => {
                self.observe(address, Outcome::Success, elapsed);
                Ok(())
            }
            Err(e) => Err(self.fail(address, &*e, elapsed, "write")),
        }
    }

    /// Read into `buf` from `address`, accounting the transaction.
    pub fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize> {
        self.prepare(address);
        let start = self.clock.now();
        let res = self.bus.read(address, buf);
        let elapsed = self.clock.now().saturating_duration_since(start);
        match res {
            Ok(n) => {
                self.observe(address, Outcome::Success, elapsed);
                Ok(n)
            }
            Err(e) => Err(self.fail(address, &*e, elapsed, "read")),
        }
    }

    fn fail(
        &mut self,
        address: u8,
        e: &(dyn std::error::Error + Send + Sync + 'static),
        elapsed: Duration,
        op: &'static str,
    ) -> eyre::Report {
        let fault = classify(e);
        tracing::trace!(address, %fault, error = %e, op, "transaction failed");
        self.observe(address, Outcome::Failure(fault), elapsed);
        eyre::Report::new(TunerError::Transaction { address, fault })
            .wrap_err(format!("{op} 0x{address:02x}"))
    }

    /// Switch to the device's override before talking to it.
    fn prepare(&mut self, address: u8) {
        if !self.adaptive {
            return;
        }
        if let Some(cfg) = self.registry.resolve_for_transaction(address, &self.current)
            && self.clock_range.adopt(cfg.clock_step, cfg.clock_hz)
            && self.rise_range.adopt(cfg.rise_step, cfg.rise_ns)
        {
            self.sync_current_from_ranges();
            self.push_to_hardware();
            tracing::debug!(
                address,
                clock_hz = cfg.clock_hz,
                rise_ns = cfg.rise_ns,
                "switched to device override"
            );
        }
    }

    /// Report one completed transaction. `write`/`read` call this themselves;
    /// callers driving the bus directly report here.
    pub fn observe(&mut self, address: u8, outcome: Outcome, elapsed: Duration) {
        let now = self.now_ms();
        let elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        let success = outcome.is_success();

        self.current.metrics.record(success, elapsed_us, now);
        if success {
            self.consecutive_errors = 0;
            self.recovery_state = self.recovery_state.after_success();
        } else {
            self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        }
        if self.adaptive {
            self.registry.register(address, &self.current);
            if let Some(dev) = self.registry.lookup_mut(address) {
                dev.config.metrics.record(success, elapsed_us, now);
            }
        }
        self.errors.record(outcome.fault());

        let stability = self.history.stability();
        self.score = score(&self.current.metrics, stability);
        self.current.metrics.stability_score = stability as u8;
        tracing::trace!(address, success, elapsed_us, score = self.score, "transaction");

        match outcome {
            Outcome::Failure(fault) => self.handle_fault(fault, now),
            Outcome::Success => {
                let interval = self.learning_cfg().sample_interval.max(1);
                if self.learning && self.current.metrics.total() % interval == 0 {
                    self.checkpoint(now);
                }
            }
        }
    }

    // ── Learning ─────────────────────────────────────────────────────────────

    fn checkpoint(&mut self, now: u64) {
        self.history.push(Snapshot {
            metrics: self.current.metrics,
            score: self.score,
        });
        self.trend = self.history.trend();
        let decision = self.evaluate(now, false);
        self.enact(decision, now);
    }

    fn evaluate(&self, now: u64, ignore_cooldown: bool) -> Decision {
        let stability = self.history.stability();
        let inputs = DecisionInputs {
            now_ms: now,
            last_adjustment_ms: self.last_adjustment_ms,
            cooldown_ms: self.cooldown_ms,
            ignore_cooldown,
            current_score: score(&self.current.metrics, stability),
            best_score: score(&self.best.metrics, stability),
            trend: self.trend,
            recent_error_rate: self.errors.recent_error_rate(),
            error_rate_pct: self.current.metrics.error_rate_pct,
            successes: self.current.metrics.successes,
            consecutive_errors: self.consecutive_errors,
            adaptation_rate: self.adaptation_rate,
        };
        let d = decide(&inputs);
        tracing::debug!(
            rationale = %d.rationale,
            clock_delta = d.clock_delta,
            rise_delta = d.rise_delta,
            confidence = d.confidence,
            current_score = inputs.current_score,
            best_score = inputs.best_score,
            trend = inputs.trend,
            "decision"
        );
        d
    }

    fn enact(&mut self, decision: Decision, now: u64) {
        match decision.best {
            BestAction::Promote => self.save_current_as_best(),
            BestAction::Restore => self.restore_best(),
            BestAction::Keep => {}
        }
        if decision.should_apply {
            self.apply_decision(&decision, now);
        }
        self.last_decision = Some(decision);
    }

    fn apply_decision(&mut self, d: &Decision, now: u64) {
        let clock_step = apply_delta(self.current.clock_step, d.clock_delta);
        let rise_step = apply_delta(self.current.rise_step, d.rise_delta);
        if !DynamicRange::is_valid_step(clock_step) || !DynamicRange::is_valid_step(rise_step) {
            return;
        }
        self.clock_range.set_step(clock_step);
        self.rise_range.set_step(rise_step);
        self.sync_current_from_ranges();
        self.push_to_hardware();
        self.current.metrics = PerformanceMetrics::starting_at(now);
        self.last_adjustment_ms = Some(now);
        tracing::info!(
            clock_hz = self.current.clock_hz,
            rise_ns = self.current.rise_ns,
            clock_step,
            rise_step,
            rationale = %d.rationale,
            "adjustment applied"
        );
    }

    fn save_current_as_best(&mut self) {
        self.best = self.current;
        self.clock_range.mark_optimal();
        self.rise_range.mark_optimal();
        tracing::info!(
            clock_hz = self.best.clock_hz,
            rise_ns = self.best.rise_ns,
            score = self.score,
            "new best configuration"
        );
    }

    fn restore_best(&mut self) {
        let best = self.best;
        if !best.valid
            || !self.clock_range.adopt(best.clock_step, best.clock_hz)
            || !self.rise_range.adopt(best.rise_step, best.rise_ns)
        {
            return;
        }
        self.current = best;
        self.push_to_hardware();
        tracing::info!(
            clock_hz = best.clock_hz,
            rise_ns = best.rise_ns,
            "restored best configuration"
        );
    }

    // ── Recovery ─────────────────────────────────────────────────────────────

    fn handle_fault(&mut self, fault: BusFault, now: u64) {
        self.last_fault = fault;
        self.last_error_ms = Some(now);
        if self.consecutive_errors >= self.learning_cfg().error_threshold.max(1) {
            self.recover(now);
        }
    }

    fn recover(&mut self, now: u64) {
        let tier = recovery::select_tier(self.emergency_recovery, self.adaptive);
        let plan = recovery::plan(
            tier,
            self.errors.recent_error_rate(),
            self.current.clock_step,
            self.current.rise_step,
        );
        let changed = plan.clock_step != self.current.clock_step
            || plan.rise_step != self.current.rise_step
            || plan.is_emergency();
        if changed {
            self.clock_range.set_step(plan.clock_step);
            self.rise_range.set_step(plan.rise_step);
            self.sync_current_from_ranges();
            self.push_to_hardware();
        }
        if plan.is_emergency() {
            self.learning = false;
            self.cooldown_ms = self.learning_cfg().emergency_cooldown_ms;
            self.last_adjustment_ms = Some(now);
        }
        self.recovery_state = plan.tier;
        self.consecutive_errors = 0;
        tracing::warn!(
            tier = plan.tier.as_str(),
            clock_hz = self.current.clock_hz,
            rise_ns = self.current.rise_ns,
            recent_error_rate = self.errors.recent_error_rate(),
            fault = %self.last_fault,
            "recovery engaged"
        );
    }

    // ── Hardware sync ────────────────────────────────────────────────────────

    fn sync_current_from_ranges(&mut self) {
        self.current.clock_step = self.clock_range.step();
        self.current.rise_step = self.rise_range.step();
        self.current.clock_hz = self.clock_range.value();
        self.current.rise_ns = self.rise_range.value();
        self.current.valid = true;
    }

    fn push_to_hardware(&mut self) {
        if let Err(e) = self
            .applier
            .apply(self.current.clock_hz, self.current.rise_ns)
        {
            tracing::warn!(error = %e, "applying bus timing failed");
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    pub fn clock_hz(&self) -> u32 {
        self.current.clock_hz
    }

    pub fn rise_time_ns(&self) -> u32 {
        self.current.rise_ns
    }

    pub fn clock_step(&self) -> u8 {
        self.current.clock_step
    }

    pub fn rise_step(&self) -> u8 {
        self.current.rise_step
    }

    /// Score of the current epoch as of the last transaction.
    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn trend(&self) -> f32 {
        self.trend
    }

    pub fn last_fault(&self) -> BusFault {
        self.last_fault
    }

    pub fn last_fault_str(&self) -> &'static str {
        self.last_fault.as_str()
    }

    /// Time of the most recent failure, in ms since construction.
    pub fn last_error_ms(&self) -> Option<u64> {
        self.last_error_ms
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.current.metrics
    }

    /// Metrics of a known device; empty when the device is unknown.
    pub fn device_metrics(&self, address: u8) -> PerformanceMetrics {
        self.registry
            .lookup(address)
            .map(|d| d.config.metrics)
            .unwrap_or_default()
    }

    /// Score of the device's own metrics; neutral when unknown.
    pub fn device_compatibility(&self, address: u8) -> f32 {
        match self.registry.lookup(address) {
            Some(d) => score(&d.config.metrics, self.history.stability()),
            None => UNKNOWN_DEVICE_COMPATIBILITY,
        }
    }

    pub fn recovery_active(&self) -> bool {
        self.recovery_state != RecoveryState::Normal
    }

    pub fn recovery_state(&self) -> RecoveryState {
        self.recovery_state
    }

    pub fn consecutive_errors(&self) -> u8 {
        self.consecutive_errors
    }

    pub fn is_learning(&self) -> bool {
        self.learning
    }

    pub fn is_adaptive(&self) -> bool {
        self.adaptive
    }

    pub fn is_emergency_recovery(&self) -> bool {
        self.emergency_recovery
    }

    pub fn adaptation_rate(&self) -> u8 {
        self.adaptation_rate
    }

    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceEntry> {
        self.registry.iter()
    }

    pub fn best_config(&self) -> &BusConfig {
        &self.best
    }

    pub fn current_config(&self) -> &BusConfig {
        &self.current
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn clock_range(&self) -> &DynamicRange {
        &self.clock_range
    }

    pub fn rise_range(&self) -> &DynamicRange {
        &self.rise_range
    }

    pub fn last_decision(&self) -> Option<&Decision> {
        self.last_decision.as_ref()
    }

    pub fn timing(&self) -> &T {
        self.applier.timing()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let stability = self.history.stability();
        Diagnostics {
            clock_hz: self.current.clock_hz,
            rise_ns: self.current.rise_ns,
            clock_step: self.current.clock_step,
            rise_step: self.current.rise_step,
            score: self.score,
            best_score: score(&self.best.metrics, stability),
            trend: self.trend,
            stability,
            recent_error_rate: self.errors.recent_error_rate(),
            metrics: self.current.metrics,
            consecutive_errors: self.consecutive_errors,
            learning: self.learning,
            adaptive: self.adaptive,
            emergency_recovery: self.emergency_recovery,
            adaptation_rate: self.adaptation_rate,
            cooldown_ms: self.cooldown_ms,
            recovery_state: self.recovery_state,
            last_fault: self.last_fault,
            devices: self.registry.len(),
            last_decision: self.last_decision,
        }
    }

    // ── Controls ─────────────────────────────────────────────────────────────

    /// Enable or disable learning. Enabling restores the configured cooldown
    /// and leaves emergency recovery.
    pub fn set_learning(&mut self, enable: bool) {
        self.learning = enable;
        if enable {
            self.cooldown_ms = self.learning_cfg().cooldown_ms;
            if self.recovery_state == RecoveryState::Emergency {
                self.recovery_state = RecoveryState::Normal;
            }
        }
    }

    pub fn set_adaptive(&mut self, enable: bool) {
        self.adaptive = enable;
    }

    pub fn set_emergency_recovery(&mut self, enable: bool) {
        self.emergency_recovery = enable;
    }

    /// Clamped to 1..=10.
    pub fn set_adaptation_rate(&mut self, rate: u8) {
        self.adaptation_rate = rate.clamp(1, 10);
    }

    pub fn set_cooldown_ms(&mut self, ms: u64) {
        self.cooldown_ms = ms;
    }

    /// Run the decision engine now, ignoring the cooldown.
    ///
    /// Does nothing (and returns `None`) before the first success of the epoch.
    pub fn force_optimization(&mut self) -> Option<Decision> {
        if self.current.metrics.successes == 0 {
            return None;
        }
        let now = self.now_ms();
        let d = self.evaluate(now, true);
        self.enact(d, now);
        Some(d)
    }

    /// Return to the construction state: factory defaults, empty metrics,
    /// histories and counters cleared, configured learning flags. Known
    /// devices and their overrides are kept.
    pub fn reset_to_defaults(&mut self) {
        let now = self.now_ms();
        self.clock_range.reset();
        self.rise_range.reset();
        self.current = BusConfig::from_ranges(&self.clock_range, &self.rise_range, now);
        self.best = self.current;
        self.history.clear();
        self.errors.clear();
        self.consecutive_errors = 0;
        self.last_adjustment_ms = None;
        self.last_error_ms = None;
        self.last_fault = BusFault::None;
        self.recovery_state = RecoveryState::Normal;
        self.score = 0.0;
        self.trend = 0.0;
        self.last_decision = None;
        let cfg = self.learning_cfg().clone();
        self.cooldown_ms = cfg.cooldown_ms;
        self.learning = cfg.enabled;
        self.adaptive = cfg.adaptive;
        self.emergency_recovery = cfg.emergency_recovery;
        self.adaptation_rate = cfg.adaptation_rate;
        self.push_to_hardware();
        tracing::info!("reset to factory defaults");
    }

    /// Forget what has been learned while keeping the active configuration.
    pub fn reset_learning(&mut self) {
        let now = self.now_ms();
        self.history.clear();
        self.errors.clear();
        self.current.metrics = PerformanceMetrics::starting_at(now);
        self.consecutive_errors = 0;
        self.last_adjustment_ms = None;
        self.score = 0.0;
        self.trend = 0.0;
        tracing::info!("learning history reset");
    }

    /// Jump the clock to the step containing `hz`; returns the applied value.
    pub fn set_clock_hz(&mut self, hz: u32) -> u32 {
        let step = self.clock_range.step_for_value(hz);
        self.set_clock_step(step);
        self.current.clock_hz
    }

    /// Jump the rise time to the step containing `ns`; returns the applied value.
    pub fn set_rise_time_ns(&mut self, ns: u32) -> u32 {
        let step = self.rise_range.step_for_value(ns);
        self.set_rise_step(step);
        self.current.rise_ns
    }

    /// Out-of-range steps are rejected without side effects.
    pub fn set_clock_step(&mut self, step: u8) -> bool {
        if !self.clock_range.set_step(step) {
            return false;
        }
        self.sync_current_from_ranges();
        self.push_to_hardware();
        true
    }

    /// Out-of-range steps are rejected without side effects.
    pub fn set_rise_step(&mut self, step: u8) -> bool {
        if !self.rise_range.set_step(step) {
            return false;
        }
        self.sync_current_from_ranges();
        self.push_to_hardware();
        true
    }

    /// Install a per-device override, registering the device if needed.
    pub fn set_device_config(&mut self, address: u8, clock_hz: u32, rise_ns: u32) -> bool {
        self.registry.register(address, &self.current);
        let ok = self.registry.set_custom(
            address,
            clock_hz,
            rise_ns,
            &self.clock_range,
            &self.rise_range,
        );
        if ok {
            tracing::info!(address, clock_hz, rise_ns, "device override installed");
        } else {
            tracing::warn!(address, "device override rejected; registry full");
        }
        ok
    }

    pub fn remove_device_config(&mut self, address: u8) -> bool {
        self.registry.remove(address)
    }

    // ── Bus discovery and sweeps ─────────────────────────────────────────────

    /// Probe the configured address span and register every responder.
    pub fn scan_bus(&mut self) -> usize {
        let (first, last) = (self.settings.scan_first, self.settings.scan_last);
        let mut found = 0;
        for address in first..=last {
            match self.bus.probe(address) {
                Ok(true) => {
                    found += 1;
                    self.registry.register(address, &self.current);
                    tracing::info!(address = %format!("0x{address:02x}"), "device found");
                }
                Ok(false) => {}
                Err(e) => tracing::debug!(address, error = %e, "probe failed"),
            }
        }
        tracing::info!(found, "bus scan complete");
        found
    }

    /// Apply a candidate and ping every known device under it.
    ///
    /// More than `MAX_TEST_ERRORS` failed pings reject the candidate and restore
    /// the previous configuration; otherwise the candidate stays applied and
    /// its metrics are returned.
    pub fn test_configuration(&mut self, clock_step: u8, rise_step: u8) -> Option<PerformanceMetrics> {
        if !DynamicRange::is_valid_step(clock_step) || !DynamicRange::is_valid_step(rise_step) {
            return None;
        }
        let saved = (self.current, self.clock_range.clone(), self.rise_range.clone());

        self.clock_range.set_step(clock_step);
        self.rise_range.set_step(rise_step);
        self.sync_current_from_ranges();
        self.current.metrics = PerformanceMetrics::starting_at(self.now_ms());
        self.push_to_hardware();

        let mut test_errors = 0u32;
        for address in self.registry.addresses() {
            let start = self.clock.now();
            let ok = matches!(self.bus.probe(address), Ok(true));
            let elapsed_us = self.clock.us_since(start);
            let now = self.now_ms();
            self.current.metrics.record(ok, elapsed_us, now);
            if !ok {
                test_errors += 1;
                if test_errors > MAX_TEST_ERRORS {
                    break;
                }
            }
        }

        if test_errors > MAX_TEST_ERRORS {
            tracing::debug!(clock_step, rise_step, test_errors, "candidate rejected");
            let (current, clock_range, rise_range) = saved;
            self.current = current;
            self.clock_range = clock_range;
            self.rise_range = rise_range;
            self.push_to_hardware();
            return None;
        }
        Some(self.current.metrics)
    }

    /// Scan, then try every step pair and keep the best scoring one.
    ///
    /// Returns `None` when no device answers the scan.
    pub fn scan_and_optimize(&mut self) -> Option<SweepReport> {
        let devices = self.scan_bus();
        if devices == 0 {
            tracing::warn!("no devices found; nothing to optimize");
            return None;
        }
        let original = (self.current, self.clock_range.clone(), self.rise_range.clone());
        let stability = self.history.stability();
        let mut best: Option<(f32, BusConfig, DynamicRange, DynamicRange)> = None;
        let mut tested = 0u32;
        let mut passed = 0u32;

        for clock_step in 0..RANGE_STEPS {
            for rise_step in 0..RANGE_STEPS {
                tested += 1;
                let Some(m) = self.test_configuration(clock_step, rise_step) else {
                    continue;
                };
                passed += 1;
                let s = score(&m, stability);
                if best.as_ref().is_none_or(|(b, ..)| s > *b) {
                    best = Some((
                        s,
                        self.current,
                        self.clock_range.clone(),
                        self.rise_range.clone(),
                    ));
                }
            }
        }

        let best_score = match best {
            Some((s, cfg, clock_range, rise_range)) => {
                self.current = cfg;
                self.clock_range = clock_range;
                self.rise_range = rise_range;
                s
            }
            None => {
                let (cfg, clock_range, rise_range) = original;
                self.current = cfg;
                self.clock_range = clock_range;
                self.rise_range = rise_range;
                0.0
            }
        };
        self.push_to_hardware();
        self.save_current_as_best();
        tracing::info!(
            tested,
            passed,
            clock_hz = self.current.clock_hz,
            rise_ns = self.current.rise_ns,
            score = best_score,
            "sweep complete"
        );
        Some(SweepReport {
            devices,
            tested,
            passed,
            clock_hz: self.current.clock_hz,
            rise_ns: self.current.rise_ns,
            score: best_score,
        })
    }
}
