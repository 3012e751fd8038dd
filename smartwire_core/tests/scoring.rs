use proptest::prelude::*;
use rstest::rstest;
use smartwire_core::decision::{BestAction, DecisionInputs, Rationale, decide};
use smartwire_core::{PerformanceMetrics, score};

proptest! {
    #[test]
    fn score_stays_in_bounds(
        successes in 0u32..100_000,
        failures in 0u32..100_000,
        average_time_us in any::<u32>(),
        stability in 0.0f32..=100.0,
    ) {
        let m = PerformanceMetrics {
            successes,
            failures,
            average_time_us,
            ..PerformanceMetrics::default()
        };
        let s = score(&m, stability);
        prop_assert!((0.0..=100.0).contains(&s), "score {} out of bounds", s);
        if successes == 0 {
            prop_assert_eq!(s, 0.0);
        }
    }

    #[test]
    fn recorded_metrics_keep_rates_consistent(outcomes in proptest::collection::vec(any::<(bool, u16)>(), 1..200)) {
        let mut m = PerformanceMetrics::default();
        for (i, (ok, us)) in outcomes.iter().enumerate() {
            m.record(*ok, u64::from(*us), i as u64);
        }
        let total = m.successes + m.failures;
        prop_assert_eq!(total as usize, outcomes.len());
        prop_assert_eq!(u32::from(m.error_rate_pct), m.failures * 100 / total);
        prop_assert!((0.0..=100.0).contains(&score(&m, 50.0)));
    }
}

#[test]
fn zero_metrics_score_zero() {
    assert_eq!(score(&PerformanceMetrics::default(), 100.0), 0.0);
}

fn inputs() -> DecisionInputs {
    DecisionInputs {
        now_ms: 60_000,
        last_adjustment_ms: None,
        cooldown_ms: 5_000,
        ignore_cooldown: false,
        current_score: 80.0,
        best_score: 80.0,
        trend: 0.0,
        recent_error_rate: 0.0,
        error_rate_pct: 0,
        successes: 0,
        consecutive_errors: 0,
        adaptation_rate: 5,
    }
}

#[test]
fn high_error_rate_outranks_optimization() {
    let d = decide(&DecisionInputs {
        recent_error_rate: 15.0,
        error_rate_pct: 0,
        successes: 25,
        trend: 5.0,
        current_score: 99.0,
        best_score: 10.0,
        ..inputs()
    });
    assert_eq!(d.rationale, Rationale::HighErrorRate);
    assert_eq!((d.clock_delta, d.rise_delta, d.confidence), (-1, 1, 85));
    assert!(d.should_apply);
    assert_eq!(d.best, BestAction::Keep);
}

#[test]
fn restore_is_immediate_and_stepless() {
    let d = decide(&DecisionInputs {
        error_rate_pct: 10,
        successes: 30,
        current_score: 40.0,
        best_score: 90.0,
        consecutive_errors: 2,
        ..inputs()
    });
    assert_eq!(d.rationale, Rationale::RestoringBest);
    assert_eq!(d.best, BestAction::Restore);
    assert_eq!(d.confidence, 95);
    assert!(!d.should_apply);
    assert_eq!((d.clock_delta, d.rise_delta), (0, 0));
}

#[test]
fn consecutive_errors_back_off() {
    let d = decide(&DecisionInputs {
        error_rate_pct: 20,
        consecutive_errors: 2,
        ..inputs()
    });
    assert_eq!(d.rationale, Rationale::ConsecutiveErrors);
    assert_eq!((d.clock_delta, d.rise_delta, d.confidence), (-1, 1, 80));
}

#[rstest]
#[case(0.3, 7, Rationale::PositiveTrend, (1, -1))]
#[case(0.3, 6, Rationale::ModerateOptimization, (1, 0))]
#[case(0.15, 4, Rationale::ModerateOptimization, (1, 0))]
#[case(0.15, 3, Rationale::NoAdjustmentNeeded, (0, 0))]
#[case(0.05, 10, Rationale::NoAdjustmentNeeded, (0, 0))]
fn trend_and_rate_thresholds(
    #[case] trend: f32,
    #[case] rate: u8,
    #[case] rationale: Rationale,
    #[case] deltas: (i8, i8),
) {
    let d = decide(&DecisionInputs {
        successes: 21,
        trend,
        adaptation_rate: rate,
        ..inputs()
    });
    assert_eq!(d.rationale, rationale);
    assert_eq!((d.clock_delta, d.rise_delta), deltas);
    // equal scores never promote
    assert_eq!(d.best, BestAction::Keep);
}

#[test]
fn cooldown_is_idempotent() {
    let inp = DecisionInputs {
        last_adjustment_ms: Some(58_000),
        recent_error_rate: 40.0,
        ..inputs()
    };
    let a = decide(&inp);
    let b = decide(&inp);
    assert_eq!(a, b);
    assert_eq!(a.rationale, Rationale::CooldownActive);
    assert!(!a.should_apply);
    // boundary: exactly `cooldown_ms` later the engine runs again
    let c = decide(&DecisionInputs {
        now_ms: 63_000,
        ..inp
    });
    assert_eq!(c.rationale, Rationale::HighErrorRate);
}
