//! Per-device configuration and metrics.

use crate::bus_config::BusConfig;
use crate::config::MAX_DEVICES;
use crate::range::DynamicRange;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub address: u8,
    pub config: BusConfig,
    /// Set once a valid override is installed; only custom entries switch the bus.
    pub custom: bool,
}

/// Bounded, insertion-ordered set of known devices.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    entries: Vec<DeviceEntry>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(MAX_DEVICES),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_DEVICES
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceEntry> {
        self.entries.iter()
    }

    pub fn addresses(&self) -> Vec<u8> {
        self.entries.iter().map(|e| e.address).collect()
    }

    pub fn lookup(&self, address: u8) -> Option<&DeviceEntry> {
        self.entries.iter().find(|e| e.address == address)
    }

    pub fn lookup_mut(&mut self, address: u8) -> Option<&mut DeviceEntry> {
        self.entries.iter_mut().find(|e| e.address == address)
    }

    /// Add `address` starting from `template`'s settings with fresh metrics.
    ///
    /// Returns false when the device is already known or the registry is full.
    pub fn register(&mut self, address: u8, template: &BusConfig) -> bool {
        if self.lookup(address).is_some() || self.is_full() {
            return false;
        }
        let mut config = *template;
        config.metrics = Default::default();
        self.entries.push(DeviceEntry {
            address,
            config,
            custom: false,
        });
        true
    }

    /// Remove `address`, keeping the order of the remaining entries.
    pub fn remove(&mut self, address: u8) -> bool {
        match self.entries.iter().position(|e| e.address == address) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    /// Install an override resolved through the ranges' conversions.
    ///
    /// Values outside a range are pinned to its ends. The ranges themselves are
    /// only read.
    pub fn set_custom(
        &mut self,
        address: u8,
        clock_hz: u32,
        rise_ns: u32,
        clock: &DynamicRange,
        rise: &DynamicRange,
    ) -> bool {
        let Some(entry) = self.lookup_mut(address) else {
            return false;
        };
        let clock_step = clock.step_for_value(clock_hz);
        let rise_step = rise.step_for_value(rise_ns);
        if !DynamicRange::is_valid_step(clock_step) || !DynamicRange::is_valid_step(rise_step) {
            return false;
        }
        entry.config.clock_step = clock_step;
        entry.config.rise_step = rise_step;
        entry.config.clock_hz = clock.value_for_step(clock_step);
        entry.config.rise_ns = rise.value_for_step(rise_step);
        entry.config.valid = true;
        entry.custom = true;
        true
    }

    /// Settings to switch to before talking to `address`, if it has an
    /// override that differs from the active configuration.
    pub fn resolve_for_transaction(&self, address: u8, active: &BusConfig) -> Option<BusConfig> {
        let entry = self.lookup(address)?;
        if !entry.custom || !entry.config.valid || entry.config.same_settings(active) {
            return None;
        }
        Some(entry.config)
    }
}
