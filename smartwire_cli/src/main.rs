#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `smartwire` binary: scan, tune and optimize an I2C bus from a TOML config.

mod cli;
mod error_fmt;
mod logging;
mod run;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;

use crate::cli::{Cli, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }

    if let Err(e) = real_main(&cli) {
        tracing::error!(error = %format!("{e:#}"), "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: &Cli) -> eyre::Result<()> {
    let text = std::fs::read_to_string(&cli.config)
        .wrap_err_with(|| format!("read config {:?}", cli.config))?;
    let cfg = smartwire_config::load_toml(&text)
        .wrap_err_with(|| format!("parse config {:?}", cli.config))?;
    cfg.validate()?;

    logging::init(cli.json, &cli.log_level, &cfg.logging)?;

    let overrides = match &cli.overrides {
        Some(path) => smartwire_config::load_overrides_csv(path)?,
        None => Vec::new(),
    };
    if let Some(dup) = overrides
        .iter()
        .find(|o| cfg.devices.iter().any(|d| d.address == o.address))
    {
        eyre::bail!(
            "duplicate override for address 0x{:02x} in config and CSV",
            dup.address
        );
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    let mut tuner = run::build(&cfg, &overrides)?;
    run::execute(&cli.cmd, &mut tuner, cli.json, &shutdown)
}
