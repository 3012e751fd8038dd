#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core bus-tuning logic (hardware-agnostic).
//!
//! This crate provides the self-tuning I2C controller. All hardware
//! interactions go through the `smartwire_traits::I2cBus` and
//! `smartwire_traits::BusTiming` traits.
//!
//! ## Architecture
//!
//! - **Ranges**: 20-step discretization of clock and rise time (`range` module)
//! - **Metrics**: per-epoch counters and the composite score (`metrics` module)
//! - **History**: score snapshots for trend/stability, fault ring (`history` module)
//! - **Decisions**: pure rule engine over a state snapshot (`decision` module)
//! - **Recovery**: incremental / adaptive / emergency tiers (`recovery` module)
//! - **Registry**: per-device metrics and overrides (`registry` module)
//! - **Controller**: `TunerCore`, tying it together (`tuner` module)
//!
//! ## Time
//!
//! Timestamps are milliseconds since the controller was built, read from an
//! injectable `Clock`; transaction durations are measured in microseconds.

pub mod applier;
pub mod builder;
pub mod bus_config;
pub mod config;
pub mod conversions;
pub mod decision;
pub mod error;
pub mod fault;
pub mod history;
pub mod hw_error;
pub mod metrics;
pub mod mocks;
pub mod range;
pub mod recovery;
pub mod registry;
pub mod tuner;

pub use builder::{Missing, Set, Tuner, TunerBuilder, TunerG, build_tuner};
pub use bus_config::BusConfig;
pub use config::{
    ERROR_HISTORY_LEN, LEARNING_WINDOW, LearningCfg, MAX_DEVICES, RANGE_STEPS, RangeCfg,
    TunerSettings,
};
pub use decision::{BestAction, Decision, DecisionInputs, Rationale, decide};
pub use error::{BuildError, Result, TunerError};
pub use fault::{BusFault, Outcome};
pub use history::{ErrorHistory, History, Snapshot};
pub use metrics::{PerformanceMetrics, score};
pub use range::DynamicRange;
pub use recovery::RecoveryState;
pub use registry::{DeviceEntry, DeviceRegistry};
pub use tuner::{Diagnostics, SweepReport, TunerCore};
