use proptest::prelude::*;
use smartwire_core::{DynamicRange, RANGE_STEPS, RangeCfg};

prop_compose! {
    fn range_strategy()(
        min in 0u32..1_000_000,
        span in 38u32..10_000_000,
        frac in 0.0f64..=1.0,
    ) -> RangeCfg {
        let default = min + (f64::from(span) * frac) as u32;
        RangeCfg { min, max: min + span, default }
    }
}

proptest! {
    #[test]
    fn values_are_monotonic_and_bounded(cfg in range_strategy()) {
        let r = DynamicRange::new(cfg);
        let mut prev = None;
        for s in 0..RANGE_STEPS {
            let v = r.value_for_step(s);
            prop_assert!(v >= cfg.min && v <= cfg.max);
            if let Some(p) = prev {
                prop_assert!(v >= p, "step {} went down: {} < {}", s, v, p);
            }
            prev = Some(v);
        }
    }

    #[test]
    fn round_trip_loses_at_most_one_step(cfg in range_strategy(), s in 0u8..RANGE_STEPS) {
        let r = DynamicRange::new(cfg);
        let back = r.step_for_value(r.value_for_step(s));
        prop_assert!(back == s || back + 1 == s, "step {} came back as {}", s, back);
    }

    #[test]
    fn step_for_value_is_always_valid(cfg in range_strategy(), v in any::<u32>()) {
        let r = DynamicRange::new(cfg);
        prop_assert!(DynamicRange::is_valid_step(r.step_for_value(v)));
    }

    #[test]
    fn default_survives_construction(cfg in range_strategy()) {
        let r = DynamicRange::new(cfg);
        prop_assert_eq!(r.value(), cfg.default);
        prop_assert_eq!(r.step(), r.step_for_value(cfg.default));
    }

    #[test]
    fn invalid_steps_never_mutate(cfg in range_strategy(), s in RANGE_STEPS..=u8::MAX) {
        let mut r = DynamicRange::new(cfg);
        let before = r.clone();
        prop_assert!(!r.set_step(s));
        prop_assert_eq!(r, before);
    }
}
