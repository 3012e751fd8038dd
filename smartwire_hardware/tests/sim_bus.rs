use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rstest::rstest;
use smartwire_hardware::{HwError, SimDevice, SimulatedBus};
use smartwire_traits::{BusTiming, Clock, I2cBus};

/// Clock that advances only through `sleep`.
#[derive(Clone)]
struct StepClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl StepClock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap()
    }
}

impl Clock for StepClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, d: Duration) {
        *self.offset.lock().unwrap() += d;
    }
}

fn rig(dev: SimDevice) -> (SimulatedBus, StepClock) {
    let clock = StepClock::new();
    let bus = SimulatedBus::new(vec![dev], Arc::new(clock.clone()));
    (bus, clock)
}

#[rstest]
// 9 bits * (1 + 2 bytes) at 100 kHz = 270 us, plus 50 us device overhead
#[case(100_000, 320)]
// 27 bits at 400 kHz = 67.5 us, rounded up
#[case(400_000, 118)]
fn transfer_time_follows_the_programmed_clock(#[case] hz: u32, #[case] expected_us: u64) {
    let (mut bus, clock) = rig(SimDevice::new(0x48).with_base_latency_us(50));
    bus.timing().set_clock_hz(hz).unwrap();
    bus.write(0x48, &[0xA0, 0x01]).unwrap();
    assert_eq!(clock.elapsed(), Duration::from_micros(expected_us));
}

#[rstest]
#[case(400_000, 60, true)]
#[case(400_001, 60, false)]
#[case(100_000, 59, false)]
#[case(1_000_000, 250, false)]
fn device_limits_gate_success(#[case] hz: u32, #[case] rise_ns: u32, #[case] ok: bool) {
    let (mut bus, _) = rig(
        SimDevice::new(0x20)
            .with_max_clock_hz(400_000)
            .with_min_rise_ns(60),
    );
    let mut timing = bus.timing();
    timing.set_clock_hz(hz).unwrap();
    timing.set_rise_time_ns(rise_ns).unwrap();
    let mut buf = [0u8; 1];
    assert_eq!(bus.read(0x20, &mut buf).is_ok(), ok);
}

#[test]
fn absent_address_is_an_address_nack() {
    let (mut bus, _) = rig(SimDevice::new(0x20));
    let err = bus.write(0x21, &[0]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HwError>(),
        Some(HwError::AddressNack(0x21))
    ));
}

#[test]
fn timing_handle_shares_state_with_the_bus() {
    let (bus, _) = rig(SimDevice::new(0x20));
    let mut timing = bus.timing();
    timing.set_clock_hz(1_000_000).unwrap();
    timing.set_rise_time_ns(80).unwrap();
    assert_eq!(bus.timing_state(), (1_000_000, 80));
    assert_eq!(timing.current(), (1_000_000, 80));
    assert_eq!(timing.applies(), 1);
    assert!(timing.set_clock_hz(0).is_err());
}
