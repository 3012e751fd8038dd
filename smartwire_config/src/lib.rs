#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and device-override parsing for the smartwire controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The override CSV loader enforces headers and rejects duplicate or
//!   out-of-range addresses before anything reaches the controller.
use serde::Deserialize;
use serde::de::Deserializer;

/// Highest valid 7-bit address that is not reserved.
pub const MAX_ADDRESS: u8 = 0x7E;

/// Smallest `max - min` of a tunable range: one unit per step of the 20-step grid.
pub const MIN_RANGE_SPAN: u32 = 19;

/// Device override CSV schema.
///
/// Expected headers:
/// address,clock_hz,rise_ns
///
/// Example:
/// address,clock_hz,rise_ns
/// 0x48,400000,100
/// 80,1000000,60
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct DeviceOverride {
    #[serde(deserialize_with = "de_address")]
    pub address: u8,
    pub clock_hz: u32,
    pub rise_ns: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BusCfg {
    /// Linux i2c-dev bus number (hardware backend only)
    pub i2c_bus: u8,
    /// First address probed by a scan
    #[serde(deserialize_with = "de_address")]
    pub scan_first: u8,
    /// Last address probed by a scan (inclusive)
    #[serde(deserialize_with = "de_address")]
    pub scan_last: u8,
}

impl Default for BusCfg {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            scan_first: 0x01,
            scan_last: MAX_ADDRESS,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RangesCfg {
    pub clock_min_hz: u32,
    pub clock_max_hz: u32,
    pub clock_default_hz: u32,
    pub rise_min_ns: u32,
    pub rise_max_ns: u32,
    pub rise_default_ns: u32,
}

impl Default for RangesCfg {
    fn default() -> Self {
        Self {
            clock_min_hz: 75_000,
            clock_max_hz: 3_500_000,
            clock_default_hz: 100_000,
            rise_min_ns: 40,
            rise_max_ns: 250,
            rise_default_ns: 125,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LearningCfg {
    /// Run the decision engine at checkpoints
    pub enabled: bool,
    /// Track per-device metrics and honour device overrides
    pub adaptive: bool,
    /// Allow the emergency recovery tier
    pub emergency_recovery: bool,
    /// 1 (conservative) ..= 10 (aggressive)
    pub adaptation_rate: u8,
    /// Minimum time between two applied adjustments
    pub cooldown_ms: u64,
    /// Cooldown installed by emergency recovery
    pub emergency_cooldown_ms: u64,
    /// Consecutive failures that trigger recovery
    pub error_threshold: u8,
    /// Transactions per decision checkpoint
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

#[derive(Debug, Deserialize, Clone)]
pub struct SimDeviceCfg {
    #[serde(deserialize_with = "de_address")]
    pub address: u8,
    #[serde(default = "default_sim_max_clock")]
    pub max_clock_hz: u32,
    #[serde(default = "default_sim_min_rise")]
    pub min_rise_ns: u32,
    #[serde(default = "default_sim_latency")]
    pub base_latency_us: u64,
}

fn default_sim_max_clock() -> u32 {
    400_000
}
fn default_sim_min_rise() -> u32 {
    40
}
fn default_sim_latency() -> u64 {
    50
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SimulationCfg {
    pub devices: Vec<SimDeviceCfg>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub bus: BusCfg,
    #[serde(default)]
    pub ranges: RangesCfg,
    #[serde(default)]
    pub learning: LearningCfg,
    /// Static per-device overrides applied at startup
    #[serde(default)]
    pub devices: Vec<DeviceOverride>,
    /// Simulated bus population (used when built without `hardware`)
    #[serde(default)]
    pub simulation: SimulationCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AddressToml {
    Int(i64),
    Text(String),
}

/// Accepts an integer or a string in decimal or `0x` hex notation.
fn de_address<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = AddressToml::deserialize(deserializer)?;
    let value = match raw {
        AddressToml::Int(v) => v,
        AddressToml::Text(s) => parse_address_text(&s).map_err(serde::de::Error::custom)?,
    };
    u8::try_from(value)
        .ok()
        .filter(|a| *a <= 0x7F)
        .ok_or_else(|| serde::de::Error::custom(format!("address {value} is not a 7-bit address")))
}

fn parse_address_text(s: &str) -> Result<i64, String> {
    let t = s.trim();
    let parsed = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => t.parse::<i64>(),
    };
    parsed.map_err(|e| format!("invalid address {t:?}: {e}"))
}

/// Load device overrides from a CSV file with the exact header `address,clock_hz,rise_ns`.
pub fn load_overrides_csv(path: &std::path::Path) -> eyre::Result<Vec<DeviceOverride>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open overrides CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["address", "clock_hz", "rise_ns"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "overrides CSV must have headers 'address,clock_hz,rise_ns', got: {}",
            actual.join(",")
        );
    }

    let mut rows: Vec<DeviceOverride> = Vec::new();
    for (idx, rec) in rdr.deserialize::<DeviceOverride>().enumerate() {
        match rec {
            Ok(row) => {
                if rows.iter().any(|r| r.address == row.address) {
                    eyre::bail!(
                        "duplicate override for address 0x{:02x} at CSV row {}",
                        row.address,
                        idx + 2
                    );
                }
                rows.push(row);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Bus
        if self.bus.scan_first == 0 {
            eyre::bail!("bus.scan_first must be >= 0x01 (0x00 is the general call address)");
        }
        if self.bus.scan_last > MAX_ADDRESS {
            eyre::bail!("bus.scan_last must be <= 0x7e");
        }
        if self.bus.scan_first > self.bus.scan_last {
            eyre::bail!("bus.scan_first must be <= bus.scan_last");
        }

        // Ranges
        let r = &self.ranges;
        if r.clock_min_hz == 0 {
            eyre::bail!("ranges.clock_min_hz must be > 0");
        }
        if r.clock_min_hz >= r.clock_max_hz {
            eyre::bail!("ranges.clock_min_hz must be < ranges.clock_max_hz");
        }
        if r.clock_max_hz - r.clock_min_hz < MIN_RANGE_SPAN {
            eyre::bail!("ranges.clock span must be at least {MIN_RANGE_SPAN} Hz");
        }
        if !(r.clock_min_hz..=r.clock_max_hz).contains(&r.clock_default_hz) {
            eyre::bail!("ranges.clock_default_hz must lie within [clock_min_hz, clock_max_hz]");
        }
        if r.rise_min_ns >= r.rise_max_ns {
            eyre::bail!("ranges.rise_min_ns must be < ranges.rise_max_ns");
        }
        if r.rise_max_ns - r.rise_min_ns < MIN_RANGE_SPAN {
            eyre::bail!("ranges.rise span must be at least {MIN_RANGE_SPAN} ns");
        }
        if !(r.rise_min_ns..=r.rise_max_ns).contains(&r.rise_default_ns) {
            eyre::bail!("ranges.rise_default_ns must lie within [rise_min_ns, rise_max_ns]");
        }

        // Learning
        let l = &self.learning;
        if !(1..=10).contains(&l.adaptation_rate) {
            eyre::bail!("learning.adaptation_rate must be in [1, 10]");
        }
        if l.error_threshold == 0 {
            eyre::bail!("learning.error_threshold must be >= 1");
        }
        if l.sample_interval == 0 {
            eyre::bail!("learning.sample_interval must be >= 1");
        }
        if l.cooldown_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("learning.cooldown_ms is unreasonably large (>24h)");
        }
        if l.emergency_cooldown_ms < l.cooldown_ms {
            eyre::bail!("learning.emergency_cooldown_ms must be >= learning.cooldown_ms");
        }

        // Devices
        for (i, d) in self.devices.iter().enumerate() {
            if d.address == 0 || d.address > MAX_ADDRESS {
                eyre::bail!("devices[{i}].address 0x{:02x} is reserved", d.address);
            }
            if self.devices[..i].iter().any(|o| o.address == d.address) {
                eyre::bail!("devices[{i}].address 0x{:02x} is duplicated", d.address);
            }
        }

        // Simulation
        for (i, d) in self.simulation.devices.iter().enumerate() {
            if d.max_clock_hz == 0 {
                eyre::bail!("simulation.devices[{i}].max_clock_hz must be > 0");
            }
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
