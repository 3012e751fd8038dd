//! `From` implementations bridging `smartwire_config` types to `smartwire_core` types.

use crate::config::{LearningCfg, RangeCfg, TunerSettings};

impl From<&smartwire_config::LearningCfg> for LearningCfg {
    fn from(c: &smartwire_config::LearningCfg) -> Self {
        Self {
            enabled: c.enabled,
            adaptive: c.adaptive,
            emergency_recovery: c.emergency_recovery,
            adaptation_rate: c.adaptation_rate,
            cooldown_ms: c.cooldown_ms,
            emergency_cooldown_ms: c.emergency_cooldown_ms,
            error_threshold: c.error_threshold,
            sample_interval: c.sample_interval,
        }
    }
}

/// Clock range of a `[ranges]` table.
pub fn clock_range(c: &smartwire_config::RangesCfg) -> RangeCfg {
    RangeCfg {
        min: c.clock_min_hz,
        max: c.clock_max_hz,
        default: c.clock_default_hz,
    }
}

/// Rise-time range of a `[ranges]` table.
pub fn rise_range(c: &smartwire_config::RangesCfg) -> RangeCfg {
    RangeCfg {
        min: c.rise_min_ns,
        max: c.rise_max_ns,
        default: c.rise_default_ns,
    }
}

impl From<&smartwire_config::Config> for TunerSettings {
    fn from(c: &smartwire_config::Config) -> Self {
        Self {
            clock_range: clock_range(&c.ranges),
            rise_range: rise_range(&c.ranges),
            learning: LearningCfg::from(&c.learning),
            scan_first: c.bus.scan_first,
            scan_last: c.bus.scan_last,
        }
    }
}
