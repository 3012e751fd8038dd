//! Performance accounting and the composite score.

/// Weight of the success ratio in the composite score.
pub const RELIABILITY_WEIGHT: f32 = 0.60;
/// Weight of the latency term.
pub const EFFICIENCY_WEIGHT: f32 = 0.25;
/// Weight of the history stability term.
pub const STABILITY_WEIGHT: f32 = 0.15;
/// Average transaction time at which efficiency drops to 50.
pub const EFFICIENCY_BASELINE_US: f32 = 1000.0;

/// Counters for one measurement epoch of one configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerformanceMetrics {
    pub successes: u32,
    pub failures: u32,
    /// Sum of elapsed times of successful transactions.
    pub total_time_us: u64,
    pub average_time_us: u32,
    pub error_rate_pct: u8,
    pub stability_score: u8,
    pub last_update_ms: u64,
}

impl PerformanceMetrics {
    /// Empty counters stamped at `now_ms`; starts a new epoch.
    pub fn starting_at(now_ms: u64) -> Self {
        Self {
            last_update_ms: now_ms,
            ..Self::default()
        }
    }

    pub fn total(&self) -> u32 {
        self.successes.saturating_add(self.failures)
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Account one completed transaction.
    pub fn record(&mut self, success: bool, elapsed_us: u64, now_ms: u64) {
        if success {
            self.successes = self.successes.saturating_add(1);
            self.total_time_us = self.total_time_us.saturating_add(elapsed_us);
        } else {
            self.failures = self.failures.saturating_add(1);
        }
        let total = u64::from(self.total());
        self.error_rate_pct = if total > 0 {
            (u64::from(self.failures) * 100 / total) as u8
        } else {
            0
        };
        if self.successes > 0 {
            let avg = self.total_time_us / u64::from(self.successes);
            self.average_time_us = u32::try_from(avg).unwrap_or(u32::MAX);
        }
        self.last_update_ms = now_ms;
    }

    /// Success ratio in percent.
    pub fn reliability(&self) -> f32 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        100.0 * self.successes as f32 / total as f32
    }

    /// 100 for instant transactions, 50 at the baseline, tending to 0.
    pub fn efficiency(&self) -> f32 {
        let e = 100.0 / (1.0 + self.average_time_us as f32 / EFFICIENCY_BASELINE_US);
        e.max(0.0)
    }
}

/// Composite score in `[0, 100]`; 0 until at least one success.
pub fn score(m: &PerformanceMetrics, stability: f32) -> f32 {
    if m.successes == 0 {
        return 0.0;
    }
    let s = RELIABILITY_WEIGHT * m.reliability()
        + EFFICIENCY_WEIGHT * m.efficiency()
        + STABILITY_WEIGHT * stability;
    if s.is_finite() { s.clamp(0.0, 100.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_metrics_score_zero() {
        let m = PerformanceMetrics::default();
        assert_eq!(score(&m, 50.0), 0.0);
        assert_eq!(m.error_rate_pct, 0);
    }

    #[test]
    fn record_updates_rates() {
        let mut m = PerformanceMetrics::starting_at(10);
        m.record(true, 300, 11);
        m.record(true, 500, 12);
        m.record(false, 9_999, 13);
        assert_eq!(m.successes, 2);
        assert_eq!(m.failures, 1);
        // failures do not add to the time budget
        assert_eq!(m.total_time_us, 800);
        assert_eq!(m.average_time_us, 400);
        assert_eq!(m.error_rate_pct, 33);
        assert_eq!(m.last_update_ms, 13);
    }

    #[test]
    fn average_untouched_without_successes() {
        let mut m = PerformanceMetrics::default();
        m.record(false, 100, 1);
        assert_eq!(m.average_time_us, 0);
        assert_eq!(m.error_rate_pct, 100);
        assert_eq!(score(&m, 100.0), 0.0);
    }

    #[test]
    fn perfect_fast_bus_scores_high() {
        let mut m = PerformanceMetrics::default();
        for _ in 0..10 {
            m.record(true, 0, 0);
        }
        // 60 + 25 + 0.15 * 50
        let s = score(&m, 50.0);
        assert!((s - 92.5).abs() < 1e-3, "{s}");
    }

    #[test]
    fn baseline_latency_halves_efficiency() {
        let mut m = PerformanceMetrics::default();
        m.record(true, 1_000, 0);
        assert!((m.efficiency() - 50.0).abs() < 1e-3);
    }
}
