//! Command execution: backend assembly, tuner construction and reporting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::WrapErr;
use serde_json::json;
use smartwire_config::{Config, DeviceOverride};
use smartwire_core::{Diagnostics, SweepReport, Tuner, TunerSettings};

use crate::cli::Commands;

/// Open the configured bus backend and build a tuner over it.
pub fn build(cfg: &Config, overrides: &[DeviceOverride]) -> eyre::Result<Tuner> {
    let settings = TunerSettings::from(cfg);
    let mut builder = Tuner::builder().with_settings(settings);
    for o in cfg.devices.iter().chain(overrides) {
        builder = builder.with_device_override(o.address, o.clock_hz, o.rise_ns);
    }

    #[cfg(feature = "hardware")]
    let builder = {
        let bus = smartwire_hardware::HardwareBus::open(cfg.bus.i2c_bus)
            .wrap_err_with(|| format!("open i2c bus {}", cfg.bus.i2c_bus))?;
        builder
            .with_bus(bus)
            .with_timing(smartwire_hardware::HardwareTiming)
    };

    #[cfg(not(feature = "hardware"))]
    let builder = {
        use smartwire_hardware::{SimDevice, SimulatedBus};
        use smartwire_traits::{Clock, MonotonicClock};

        let devices = cfg
            .simulation
            .devices
            .iter()
            .map(|d| {
                SimDevice::new(d.address)
                    .with_max_clock_hz(d.max_clock_hz)
                    .with_min_rise_ns(d.min_rise_ns)
                    .with_base_latency_us(d.base_latency_us)
            })
            .collect();
        let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
        let bus = SimulatedBus::new(devices, clock);
        tracing::info!(
            devices = cfg.simulation.devices.len(),
            "using simulated bus"
        );
        let timing = bus.timing();
        builder.with_bus(bus).with_timing(timing)
    };

    let mut tuner = builder.build().wrap_err("build tuner")?;
    tuner.begin();
    Ok(tuner)
}

/// Execute one subcommand and print its report to stdout.
pub fn execute(
    cmd: &Commands,
    tuner: &mut Tuner,
    json_out: bool,
    shutdown: &Arc<AtomicBool>,
) -> eyre::Result<()> {
    match cmd {
        Commands::Scan => {
            tuner.scan_bus();
            let addrs: Vec<u8> = tuner.devices().map(|d| d.address).collect();
            if json_out {
                let list: Vec<String> = addrs.iter().map(|a| format!("0x{a:02x}")).collect();
                println!("{}", json!({ "devices": list, "count": addrs.len() }));
            } else if addrs.is_empty() {
                println!("no devices found");
            } else {
                for a in &addrs {
                    println!("0x{a:02x}");
                }
                println!("{} device(s) found", addrs.len());
            }
        }
        Commands::Tune {
            address,
            transactions,
            bytes,
        } => {
            let mut buf = vec![0u8; (*bytes).max(1)];
            let mut failed = 0u32;
            let mut run = 0u32;
            tracing::info!(address = %format!("0x{address:02x}"), transactions, "tune start");
            while run < *transactions {
                if shutdown.load(Ordering::Relaxed) {
                    tracing::warn!(run, "interrupted");
                    break;
                }
                if let Err(e) = tuner.read(*address, &mut buf) {
                    failed += 1;
                    tracing::debug!(error = %format!("{e:#}"), "transaction failed");
                }
                run += 1;
            }
            let diag = tuner.diagnostics();
            if json_out {
                println!("{}", tune_json(*address, run, failed, &diag));
            } else {
                print_tune(*address, run, failed, &diag);
            }
        }
        Commands::Optimize => {
            let report = tuner
                .scan_and_optimize()
                .ok_or_else(|| eyre::eyre!("no devices found on the bus; nothing to optimize"))?;
            if json_out {
                println!("{}", sweep_json(&report));
            } else {
                print_sweep(&report);
            }
        }
        Commands::SelfCheck => {
            let found = tuner.scan_bus();
            if json_out {
                println!(
                    "{}",
                    json!({
                        "status": "ok",
                        "devices": found,
                        "clock_hz": tuner.clock_hz(),
                        "rise_ns": tuner.rise_time_ns(),
                    })
                );
            } else {
                println!(
                    "OK: {found} device(s), clock {} Hz, rise {} ns",
                    tuner.clock_hz(),
                    tuner.rise_time_ns()
                );
            }
        }
    }
    Ok(())
}

fn tune_json(address: u8, run: u32, failed: u32, d: &Diagnostics) -> serde_json::Value {
    json!({
        "address": format!("0x{address:02x}"),
        "transactions": run,
        "failed": failed,
        "clock_hz": d.clock_hz,
        "rise_ns": d.rise_ns,
        "clock_step": d.clock_step,
        "rise_step": d.rise_step,
        "score": d.score,
        "best_score": d.best_score,
        "trend": d.trend,
        "stability": d.stability,
        "error_rate_pct": d.metrics.error_rate_pct,
        "average_time_us": d.metrics.average_time_us,
        "recovery": d.recovery_state.as_str(),
        "learning": d.learning,
        "last_fault": d.last_fault.as_str(),
        "last_decision": d.last_decision.as_ref().map(|dec| dec.rationale.as_str()),
    })
}

fn print_tune(address: u8, run: u32, failed: u32, d: &Diagnostics) {
    println!("device 0x{address:02x}: {run} transaction(s), {failed} failed");
    println!(
        "clock {} Hz (step {}), rise {} ns (step {})",
        d.clock_hz, d.clock_step, d.rise_ns, d.rise_step
    );
    println!(
        "score {:.1} (best {:.1}), trend {:+.2}, stability {:.1}",
        d.score, d.best_score, d.trend, d.stability
    );
    println!(
        "error rate {}%, avg {} us, recovery {}, learning {}",
        d.metrics.error_rate_pct,
        d.metrics.average_time_us,
        d.recovery_state.as_str(),
        if d.learning { "on" } else { "off" }
    );
    if let Some(dec) = &d.last_decision {
        println!("last decision: {}", dec.rationale);
    }
}

fn sweep_json(r: &SweepReport) -> serde_json::Value {
    json!({
        "devices": r.devices,
        "tested": r.tested,
        "passed": r.passed,
        "clock_hz": r.clock_hz,
        "rise_ns": r.rise_ns,
        "score": r.score,
    })
}

fn print_sweep(r: &SweepReport) {
    println!(
        "swept {} configuration(s) over {} device(s), {} passed",
        r.tested, r.devices, r.passed
    );
    println!(
        "selected clock {} Hz, rise {} ns (score {:.1})",
        r.clock_hz, r.rise_ns, r.score
    );
}
