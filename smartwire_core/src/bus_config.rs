use crate::metrics::PerformanceMetrics;
use crate::range::DynamicRange;

/// A resolved (clock, rise time) configuration with the metrics measured under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    pub clock_step: u8,
    pub rise_step: u8,
    pub clock_hz: u32,
    pub rise_ns: u32,
    pub metrics: PerformanceMetrics,
    pub valid: bool,
}

impl BusConfig {
    /// Capture the ranges' current position with empty metrics.
    pub fn from_ranges(clock: &DynamicRange, rise: &DynamicRange, now_ms: u64) -> Self {
        Self {
            clock_step: clock.step(),
            rise_step: rise.step(),
            clock_hz: clock.value(),
            rise_ns: rise.value(),
            metrics: PerformanceMetrics::starting_at(now_ms),
            valid: true,
        }
    }

    /// Same electrical settings, ignoring metrics.
    pub fn same_settings(&self, other: &BusConfig) -> bool {
        self.clock_hz == other.clock_hz && self.rise_ns == other.rise_ns
    }
}
