//! Runtime configuration types for the tuning engine.
//!
//! These are the runtime structs used by `TunerCore`. They are separate from
//! the TOML-deserialized config in `smartwire_config`.

/// Number of discrete positions in every dynamic range.
pub const RANGE_STEPS: u8 = 20;
/// Capacity of the snapshot history used for trend and stability.
pub const LEARNING_WINDOW: usize = 10;
/// Capacity of the per-transaction fault ring.
pub const ERROR_HISTORY_LEN: usize = 20;
/// Capacity of the device registry.
pub const MAX_DEVICES: usize = 16;

/// Bounds and factory default of one tunable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeCfg {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

impl RangeCfg {
    /// Bus clock: 75 kHz safety minimum to 3.5 MHz, 100 kHz default.
    pub const CLOCK_HZ: Self = Self {
        min: 75_000,
        max: 3_500_000,
        default: 100_000,
    };
    /// Rise time: 40 ns (aggressive) to 250 ns (conservative), 125 ns default.
    pub const RISE_NS: Self = Self {
        min: 40,
        max: 250,
        default: 125,
    };

    /// A range must have at least one unit per step so that conversions
    /// round-trip within one step.
    pub fn is_valid(&self) -> bool {
        self.max > self.min
            && self.max - self.min >= u32::from(RANGE_STEPS - 1)
            && (self.min..=self.max).contains(&self.default)
    }
}

/// Learning and recovery configuration.
#[derive(Debug, Clone)]
pub struct LearningCfg {
    /// Run the decision engine at checkpoints.
    pub enabled: bool,
    /// Track per-device metrics and honour device overrides.
    pub adaptive: bool,
    /// Allow the emergency recovery tier.
    pub emergency_recovery: bool,
    /// 1 (conservative) ..= 10 (aggressive).
    pub adaptation_rate: u8,
    /// Minimum time between two applied adjustments.
    pub cooldown_ms: u64,
    /// Cooldown installed by emergency recovery.
    pub emergency_cooldown_ms: u64,
    /// Consecutive failures that trigger one recovery tier.
    pub error_threshold: u8,
    /// Transactions per decision checkpoint.
    pub sample_interval: u32,
}

impl Default for LearningCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            adaptive: true,
            emergency_recovery: true,
            adaptation_rate: 5,
            cooldown_ms: 5_000,
            emergency_cooldown_ms: 15_000,
            error_threshold: 3,
            sample_interval: 5,
        }
    }
}

/// Everything needed to construct a `TunerCore` besides its hardware.
#[derive(Debug, Clone)]
pub struct TunerSettings {
    pub clock_range: RangeCfg,
    pub rise_range: RangeCfg,
    pub learning: LearningCfg,
    /// Inclusive address span probed by `scan_bus`.
    pub scan_first: u8,
    pub scan_last: u8,
}

impl Default for TunerSettings {
    fn default() -> Self {
        Self {
            clock_range: RangeCfg::CLOCK_HZ,
            rise_range: RangeCfg::RISE_NS,
            learning: LearningCfg::default(),
            scan_first: 0x01,
            scan_last: 0x7E,
        }
    }
}
