//! Bus discovery, candidate testing and the full sweep.

use std::sync::Arc;
use std::time::Duration;

use smartwire_core::mocks::{ManualClock, RecordingTiming, ScriptedBus};
use smartwire_core::{BusFault, RANGE_STEPS, Tuner};
use smartwire_hardware::{SimDevice, SimulatedBus};

fn scripted(devices: &[u8]) -> (Tuner, ScriptedBus) {
    let clock = ManualClock::new();
    let bus = ScriptedBus::with_latency(clock.clone(), Duration::from_micros(100)).with_devices(devices);
    let tuner = Tuner::builder()
        .with_bus(bus.clone())
        .with_timing(RecordingTiming::new())
        .with_clock(Box::new(clock))
        .build()
        .expect("build tuner");
    (tuner, bus)
}

#[test]
fn scan_registers_responders() {
    let (mut t, bus) = scripted(&[0x20, 0x48, 0x76]);
    assert_eq!(t.scan_bus(), 3);
    let found: Vec<u8> = t.devices().map(|d| d.address).collect();
    assert_eq!(found, vec![0x20, 0x48, 0x76]);
    // 0x01..=0x7E
    assert_eq!(bus.transactions(), 126);
    // a second scan does not duplicate entries
    assert_eq!(t.scan_bus(), 3);
    assert_eq!(t.devices().count(), 3);
}

#[test]
fn scan_respects_configured_span() {
    let clock = ManualClock::new();
    let bus = ScriptedBus::new().with_devices(&[0x20, 0x48]);
    let mut t = Tuner::builder()
        .with_bus(bus.clone())
        .with_timing(RecordingTiming::new())
        .with_clock(Box::new(clock))
        .with_scan_span(0x40, 0x4F)
        .build()
        .expect("build tuner");
    assert_eq!(t.scan_bus(), 1);
    assert_eq!(bus.transactions(), 16);
}

#[test]
fn rejected_candidate_restores_previous_configuration() {
    let (mut t, bus) = scripted(&[0x20, 0x21, 0x22]);
    t.begin();
    t.scan_bus();
    let before = *t.current_config();

    bus.push(BusFault::AddressNack, 3);
    assert!(t.test_configuration(10, 10).is_none());
    assert_eq!(t.current_config().clock_hz, before.clock_hz);
    assert_eq!(t.current_config().rise_ns, before.rise_ns);
    assert_eq!(t.clock_range().value(), 100_000);

    let m = t.test_configuration(10, 10).expect("all devices answer");
    assert_eq!(m.successes, 3);
    assert_eq!(m.failures, 0);
    assert_eq!(t.clock_step(), 10);
    assert_eq!(t.rise_step(), 10);
}

#[test]
fn two_failed_pings_are_tolerated() {
    let (mut t, bus) = scripted(&[0x20, 0x21, 0x22]);
    t.scan_bus();
    bus.push(BusFault::Timeout, 2);
    let m = t.test_configuration(3, 3).expect("two errors pass");
    assert_eq!((m.successes, m.failures), (1, 2));
}

#[test]
fn out_of_range_candidate_is_refused() {
    let (mut t, _bus) = scripted(&[0x20]);
    assert!(t.test_configuration(RANGE_STEPS, 0).is_none());
    assert!(t.test_configuration(0, RANGE_STEPS).is_none());
}

#[test]
fn optimize_without_devices_is_a_no_op() {
    let (mut t, _bus) = scripted(&[]);
    assert!(t.scan_and_optimize().is_none());
    assert_eq!(t.clock_hz(), 100_000);
}

#[test]
fn sweep_picks_fastest_configuration_every_device_accepts() {
    let clock = ManualClock::new();
    let bus = SimulatedBus::new(
        vec![
            SimDevice::new(0x48).with_max_clock_hz(400_000).with_min_rise_ns(60),
            SimDevice::new(0x50).with_max_clock_hz(1_000_000).with_min_rise_ns(60),
        ],
        Arc::new(clock.clone()),
    );
    let timing = bus.timing();
    let mut t = Tuner::builder()
        .with_bus(bus)
        .with_timing(timing.clone())
        .with_clock(Box::new(clock))
        .build()
        .expect("build tuner");
    t.begin();

    let report = t.scan_and_optimize().expect("devices present");
    assert_eq!(report.devices, 2);
    assert_eq!(report.tested, u32::from(RANGE_STEPS) * u32::from(RANGE_STEPS));
    // two devices can never exceed the error budget
    assert_eq!(report.passed, report.tested);

    // step 1 (~255 kHz) is the fastest grid clock under 400 kHz; the first
    // rise step at or above 60 ns is step 2
    assert_eq!(t.clock_step(), 1);
    assert_eq!(t.rise_step(), 2);
    assert_eq!(report.clock_hz, t.clock_range().value_for_step(1));
    assert_eq!(timing.current(), (t.clock_hz(), t.rise_time_ns()));
    assert_eq!(t.best_config().clock_hz, t.clock_hz());
    assert_eq!(t.clock_range().optimal_step(), 1);
    assert!(report.score > 0.0);
}
