//! Pushes resolved settings to the platform through `BusTiming`.

use eyre::WrapErr;
use smartwire_traits::{BusTiming, TimingCaps};

use crate::error::{Result, TunerError};

pub struct Applier<T: BusTiming> {
    timing: T,
    caps: TimingCaps,
    clock_warned: bool,
    rise_warned: bool,
    applied: u32,
}

impl<T: BusTiming> Applier<T> {
    pub fn new(timing: T) -> Self {
        let caps = timing.caps();
        Self {
            timing,
            caps,
            clock_warned: false,
            rise_warned: false,
            applied: 0,
        }
    }

    pub fn caps(&self) -> TimingCaps {
        self.caps
    }

    pub fn timing(&self) -> &T {
        &self.timing
    }

    /// Successful pushes so far.
    pub fn applied(&self) -> u32 {
        self.applied
    }

    /// Program `clock_hz` and, where supported, `rise_ns`.
    ///
    /// Axes the platform cannot program are skipped with a one-time warning.
    pub fn apply(&mut self, clock_hz: u32, rise_ns: u32) -> Result<()> {
        if self.caps.clock {
            self.timing
                .set_clock_hz(clock_hz)
                .map_err(|e| eyre::Report::new(TunerError::Apply(e.to_string())))
                .wrap_err_with(|| format!("set clock to {clock_hz} Hz"))?;
        } else if !self.clock_warned {
            tracing::warn!(clock_hz, "platform cannot program the bus clock; keeping its setting");
            self.clock_warned = true;
        }

        if self.caps.rise_time {
            self.timing
                .set_rise_time_ns(rise_ns)
                .map_err(|e| eyre::Report::new(TunerError::Apply(e.to_string())))
                .wrap_err_with(|| format!("set rise time to {rise_ns} ns"))?;
        } else if !self.rise_warned {
            tracing::warn!(rise_ns, "platform cannot program rise time; tuning clock only");
            self.rise_warned = true;
        }

        self.applied = self.applied.saturating_add(1);
        tracing::trace!(clock_hz, rise_ns, "timing applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{RecordingTiming, TimingEvent};

    #[test]
    fn skips_rise_time_without_capability() {
        let timing = RecordingTiming::with_caps(TimingCaps::CLOCK_ONLY);
        let mut a = Applier::new(timing.clone());
        a.apply(400_000, 60).unwrap();
        assert_eq!(timing.events(), vec![TimingEvent::Clock(400_000)]);
    }

    #[test]
    fn failure_is_reported_as_apply_error() {
        let timing = RecordingTiming::new();
        timing.fail_next(1);
        let mut a = Applier::new(timing.clone());
        let err = a.apply(400_000, 60).unwrap_err();
        assert!(matches!(err.downcast_ref::<TunerError>(), Some(TunerError::Apply(_))));
        assert_eq!(a.applied(), 0);
        a.apply(400_000, 60).unwrap();
        assert_eq!(
            timing.events(),
            vec![TimingEvent::Clock(400_000), TimingEvent::Rise(60)]
        );
    }
}
