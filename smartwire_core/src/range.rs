//! Discretized parameter model.
//!
//! A `DynamicRange` maps a continuous electrical parameter onto
//! `RANGE_STEPS` evenly spaced positions:
//!
//!   value(step) = min + trunc(step * step_size),  step_size = (max - min) / (RANGE_STEPS - 1)
//!
//! Rounding: because `value_for_step` truncates, the value for step `s` can land
//! just below the exact grid point, and `step_for_value` (which floors) then
//! reports `s - 1`. For ranges spanning at least `RANGE_STEPS - 1` units the
//! round trip `step_for_value(value_for_step(s))` is always `s` or `s - 1`.

use crate::config::{RANGE_STEPS, RangeCfg};

const MAX_STEP: u8 = RANGE_STEPS - 1;

#[derive(Debug, Clone, PartialEq)]
pub struct DynamicRange {
    min: u32,
    max: u32,
    default: u32,
    current: u32,
    step: u8,
    optimal_step: u8,
    step_size: f32,
}

impl DynamicRange {
    /// Build a range positioned at its factory default.
    ///
    /// The default value is kept verbatim (it need not sit on the grid); the
    /// step is the floor step of the default.
    pub fn new(cfg: RangeCfg) -> Self {
        let span = cfg.max.saturating_sub(cfg.min);
        let step_size = span as f32 / f32::from(MAX_STEP);
        let mut r = Self {
            min: cfg.min,
            max: cfg.max.max(cfg.min),
            default: cfg.default.clamp(cfg.min, cfg.max.max(cfg.min)),
            current: 0,
            step: 0,
            optimal_step: 0,
            step_size,
        };
        r.reset();
        r
    }

    /// Return to the factory default value and its floor step.
    pub fn reset(&mut self) {
        self.step = self.step_for_value(self.default);
        self.current = self.default;
        self.optimal_step = self.step;
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn default_value(&self) -> u32 {
        self.default
    }

    pub fn value(&self) -> u32 {
        self.current
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn optimal_step(&self) -> u8 {
        self.optimal_step
    }

    pub fn step_size(&self) -> f32 {
        self.step_size
    }

    pub fn is_valid_step(step: u8) -> bool {
        step < RANGE_STEPS
    }

    /// Value at `step`; out-of-range steps are clamped to the last step.
    pub fn value_for_step(&self, step: u8) -> u32 {
        let s = step.min(MAX_STEP);
        let offset = (f32::from(s) * self.step_size) as u32;
        self.min.saturating_add(offset).min(self.max)
    }

    /// Floor step for `value`; values outside the range pin to the ends.
    pub fn step_for_value(&self, value: u32) -> u8 {
        if value <= self.min {
            return 0;
        }
        if value >= self.max {
            return MAX_STEP;
        }
        if self.step_size <= 0.0 {
            return 0;
        }
        let raw = ((value - self.min) as f32 / self.step_size) as u32;
        raw.min(u32::from(MAX_STEP)) as u8
    }

    /// Move to `step`; returns false (and changes nothing) when out of range.
    pub fn set_step(&mut self, step: u8) -> bool {
        if !Self::is_valid_step(step) {
            return false;
        }
        self.step = step;
        self.current = self.value_for_step(step);
        true
    }

    /// Install a previously resolved (step, value) pair verbatim, e.g. a saved
    /// best configuration that still carries the off-grid factory default.
    pub fn adopt(&mut self, step: u8, value: u32) -> bool {
        if !Self::is_valid_step(step) || !(self.min..=self.max).contains(&value) {
            return false;
        }
        self.step = step;
        self.current = value;
        true
    }

    /// Remember the current step as the best performing one.
    pub fn mark_optimal(&mut self) {
        self.optimal_step = self.step;
    }

    /// Largest valid step index.
    pub const fn max_step() -> u8 {
        MAX_STEP
    }
}
