//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "smartwire", version, about = "Self-tuning I2C bus controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/smartwire.toml")]
    pub config: PathBuf,

    /// Optional device override CSV (strict header)
    #[arg(long, value_name = "FILE")]
    pub overrides: Option<PathBuf>,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe the configured address span and list responding devices
    Scan,
    /// Run read transactions against one device with learning enabled
    Tune {
        /// Target address, decimal or 0x-prefixed hex
        #[arg(long, value_parser = parse_address)]
        address: u8,
        /// Number of transactions to run
        #[arg(long, value_name = "N", default_value_t = 100)]
        transactions: u32,
        /// Bytes read per transaction
        #[arg(long, value_name = "K", default_value_t = 2)]
        bytes: usize,
    },
    /// Sweep every clock/rise step pair and keep the best scoring one
    Optimize,
    /// Quick health check (bus opens, controller builds, scan runs)
    SelfCheck,
}

/// Parse a 7-bit address given as decimal or `0x` hex.
pub fn parse_address(s: &str) -> Result<u8, String> {
    let t = s.trim();
    let parsed = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => t.parse::<u8>(),
    };
    match parsed {
        Ok(a) if (0x01..=smartwire_config::MAX_ADDRESS).contains(&a) => Ok(a),
        Ok(a) => Err(format!("0x{a:02x} is not a usable 7-bit address")),
        Err(e) => Err(format!("invalid address {t:?}: {e}")),
    }
}
