//! Human-readable error descriptions and structured JSON error formatting.

use smartwire_core::error::{BuildError, TunerError};
use smartwire_core::fault::BusFault;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingBus => {
                "What happened: No bus was provided to the controller.\nLikely causes: The bus backend failed to open or was not wired into the builder.\nHow to fix: Ensure the backend is created successfully and passed via with_bus(...).".to_string()
            }
            BuildError::MissingTiming => {
                "What happened: No timing sink was provided to the controller.\nLikely causes: The backend's timing handle was not wired into the builder.\nHow to fix: Pass the backend's timing handle via with_timing(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in [ranges] or [learning].\nHow to fix: Edit the config file, then rerun. See etc/smartwire.toml for a sample."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<TunerError>() {
        return match te {
            TunerError::Transaction { address, fault } => {
                let hint = match fault {
                    BusFault::AddressNack => {
                        "No device answered at that address, or it is powered down.\nHow to fix: Run `smartwire scan` and check the address and wiring."
                    }
                    BusFault::DataNack => {
                        "The device rejected data, often because the clock is too fast for it.\nHow to fix: Lower ranges.clock_max_hz or add a device override with a slower clock."
                    }
                    BusFault::Timeout => {
                        "The bus did not complete in time; SDA/SCL may be held low or pull-ups are missing.\nHow to fix: Check pull-up resistors and wiring, then power-cycle the bus."
                    }
                    BusFault::None | BusFault::Other => {
                        "Signal integrity problem or driver error.\nHow to fix: Re-run with --log-level=debug for details."
                    }
                };
                format!(
                    "What happened: Transaction with 0x{address:02x} failed ({fault}).\nLikely causes: {hint}"
                )
            }
            TunerError::Apply(msg) => format!(
                "What happened: Bus timing could not be applied ({msg}).\nLikely causes: The driver rejected the clock or rise time.\nHow to fix: Narrow [ranges] to values the bus driver supports."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<toml::de::Error>() {
        return format!(
            "What happened: The config file is not valid TOML for this tool.\nLikely causes: Typo, wrong type, or unknown value.\nHow to fix: Correct the file. Parser said: {}",
            te.message()
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("overrides csv must have headers") {
        return "Invalid headers in overrides CSV. Expected 'address,clock_hz,rise_ns'.".to_string();
    }

    if lower.contains("duplicate override") || lower.contains("is duplicated") {
        return format!(
            "What happened: The same device address is overridden twice.\nLikely causes: Repeated rows in [[devices]] or the overrides CSV.\nHow to fix: Keep one override per address. Original: {msg}"
        );
    }

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong path or missing permissions.\nHow to fix: Pass --config with a readable TOML file. Original: {msg}"
        );
    }

    if lower.contains("open i2c") {
        return "What happened: Failed to open the I2C bus.\nLikely causes: I2C disabled, wrong bus.i2c_bus, or insufficient permissions on /dev/i2c-*.\nHow to fix: Enable I2C, fix [bus] in the config, and add the user to the i2c group.".to_string();
    }

    if lower.contains("no devices found") {
        return "What happened: No device answered the bus scan.\nLikely causes: Nothing connected, wrong scan span, or bus stuck.\nHow to fix: Check wiring and [bus] scan_first/scan_last, then rerun `smartwire scan`.".to_string();
    }

    if lower.starts_with("bus.")
        || lower.starts_with("ranges.")
        || lower.starts_with("learning.")
        || lower.starts_with("devices[")
        || lower.starts_with("simulation.")
        || lower.starts_with("logging.")
    {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range or inconsistent values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error family; anything untyped returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(te) = err.downcast_ref::<TunerError>() {
        return match te {
            TunerError::Transaction { .. } => 3,
            TunerError::Apply(_) => 4,
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return 6;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(te) = err.downcast_ref::<TunerError>() {
        return match te {
            TunerError::Transaction { .. } => "Transaction",
            TunerError::Apply(_) => "Apply",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let msg = humanize(err);
    if let Some(TunerError::Transaction { address, fault }) = err.downcast_ref::<TunerError>() {
        return json!({
            "reason": reason_name(err),
            "details": { "address": format!("0x{address:02x}"), "fault": fault.as_str() },
            "message": msg,
        })
        .to_string();
    }
    json!({ "reason": reason_name(err), "message": msg }).to_string()
}
