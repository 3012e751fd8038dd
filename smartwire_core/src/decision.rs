//! Rule-based decision engine.
//!
//! `decide` is a pure function of the controller state captured in
//! `DecisionInputs`; applying the result is the controller's job.

use std::fmt;

use crate::config::RANGE_STEPS;

/// Recent fault ring percentage above which the bus is backed off.
pub const HIGH_ERROR_RATE: f32 = 10.0;
/// Successes required in an error-free epoch before optimizing.
pub const MIN_SUCCESSES: u32 = 20;
/// Ratio over the best score needed to promote the current config.
pub const PROMOTE_RATIO: f32 = 1.15;
/// Ratio under the best score that triggers restoration.
pub const RESTORE_RATIO: f32 = 0.7;
pub const STRONG_TREND: f32 = 0.2;
pub const MODERATE_TREND: f32 = 0.1;
pub const AGGRESSIVE_RATE: u8 = 6;
pub const MODERATE_RATE: u8 = 3;
/// Consecutive errors that make the engine back off outside recovery.
pub const CONSECUTIVE_ERROR_LIMIT: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rationale {
    CooldownActive,
    HighErrorRate,
    NewBest,
    PositiveTrend,
    ModerateOptimization,
    RestoringBest,
    ConsecutiveErrors,
    NoAdjustmentNeeded,
}

impl Rationale {
    pub fn as_str(self) -> &'static str {
        match self {
            Rationale::CooldownActive => "cooldown active",
            Rationale::HighErrorRate => "high error rate",
            Rationale::NewBest => "new best configuration",
            Rationale::PositiveTrend => "positive trend, optimizing speed",
            Rationale::ModerateOptimization => "moderate optimization",
            Rationale::RestoringBest => "restoring best configuration",
            Rationale::ConsecutiveErrors => "consecutive errors",
            Rationale::NoAdjustmentNeeded => "no adjustment needed",
        }
    }
}

impl fmt::Display for Rationale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side effect on the best-known configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BestAction {
    #[default]
    Keep,
    /// Save the current configuration as best before any step change.
    Promote,
    /// Reinstate the best configuration immediately.
    Restore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub clock_delta: i8,
    pub rise_delta: i8,
    pub confidence: u8,
    pub should_apply: bool,
    pub rationale: Rationale,
    pub best: BestAction,
}

impl Decision {
    fn hold(rationale: Rationale) -> Self {
        Self {
            clock_delta: 0,
            rise_delta: 0,
            confidence: 0,
            should_apply: false,
            rationale,
            best: BestAction::Keep,
        }
    }

    fn step(clock_delta: i8, rise_delta: i8, confidence: u8, rationale: Rationale) -> Self {
        Self {
            clock_delta,
            rise_delta,
            confidence,
            should_apply: true,
            rationale,
            best: BestAction::Keep,
        }
    }
}

/// Controller state the engine looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionInputs {
    pub now_ms: u64,
    /// `None` until the first adjustment; no cooldown applies then.
    pub last_adjustment_ms: Option<u64>,
    pub cooldown_ms: u64,
    pub ignore_cooldown: bool,
    pub current_score: f32,
    pub best_score: f32,
    pub trend: f32,
    pub recent_error_rate: f32,
    pub error_rate_pct: u8,
    pub successes: u32,
    pub consecutive_errors: u8,
    pub adaptation_rate: u8,
}

/// First matching rule wins; cooldown short-circuits everything.
pub fn decide(inp: &DecisionInputs) -> Decision {
    if !inp.ignore_cooldown
        && let Some(last) = inp.last_adjustment_ms
        && inp.now_ms.saturating_sub(last) < inp.cooldown_ms
    {
        return Decision::hold(Rationale::CooldownActive);
    }

    if inp.recent_error_rate > HIGH_ERROR_RATE {
        return Decision::step(-1, 1, 85, Rationale::HighErrorRate);
    }

    if inp.error_rate_pct == 0 && inp.successes > MIN_SUCCESSES {
        let promote = inp.current_score > inp.best_score * PROMOTE_RATIO;
        let mut d = if inp.trend > STRONG_TREND && inp.adaptation_rate > AGGRESSIVE_RATE {
            Decision::step(1, -1, 70, Rationale::PositiveTrend)
        } else if inp.trend > MODERATE_TREND && inp.adaptation_rate > MODERATE_RATE {
            Decision::step(1, 0, 60, Rationale::ModerateOptimization)
        } else if promote {
            Decision::hold(Rationale::NewBest)
        } else {
            Decision::hold(Rationale::NoAdjustmentNeeded)
        };
        if promote {
            d.best = BestAction::Promote;
        }
        return d;
    }

    if inp.current_score < inp.best_score * RESTORE_RATIO {
        return Decision {
            confidence: 95,
            best: BestAction::Restore,
            ..Decision::hold(Rationale::RestoringBest)
        };
    }

    if inp.consecutive_errors >= CONSECUTIVE_ERROR_LIMIT {
        return Decision::step(-1, 1, 80, Rationale::ConsecutiveErrors);
    }

    Decision::hold(Rationale::NoAdjustmentNeeded)
}

/// Apply a signed delta to a step, absorbing at both ends.
pub fn apply_delta(step: u8, delta: i8) -> u8 {
    let next = i16::from(step) + i16::from(delta);
    next.clamp(0, i16::from(RANGE_STEPS - 1)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> DecisionInputs {
        DecisionInputs {
            now_ms: 100_000,
            last_adjustment_ms: None,
            cooldown_ms: 5_000,
            ignore_cooldown: false,
            current_score: 50.0,
            best_score: 50.0,
            trend: 0.0,
            recent_error_rate: 0.0,
            error_rate_pct: 0,
            successes: 5,
            consecutive_errors: 0,
            adaptation_rate: 5,
        }
    }

    #[test]
    fn cooldown_blocks_everything() {
        let inp = DecisionInputs {
            last_adjustment_ms: Some(99_000),
            recent_error_rate: 50.0,
            ..base()
        };
        let d = decide(&inp);
        assert!(!d.should_apply);
        assert_eq!(d.rationale, Rationale::CooldownActive);
        let forced = decide(&DecisionInputs {
            ignore_cooldown: true,
            ..inp
        });
        assert_eq!(forced.rationale, Rationale::HighErrorRate);
    }

    #[test]
    fn promote_without_step_is_new_best() {
        let d = decide(&DecisionInputs {
            successes: 25,
            current_score: 80.0,
            best_score: 0.0,
            ..base()
        });
        assert_eq!(d.best, BestAction::Promote);
        assert_eq!(d.rationale, Rationale::NewBest);
        assert!(!d.should_apply);
    }

    #[test]
    fn strong_trend_needs_aggressive_rate() {
        let inp = DecisionInputs {
            successes: 25,
            trend: 0.5,
            ..base()
        };
        let d = decide(&inp);
        assert_eq!(d.rationale, Rationale::ModerateOptimization);
        assert_eq!((d.clock_delta, d.rise_delta), (1, 0));
        let d = decide(&DecisionInputs {
            adaptation_rate: 7,
            ..inp
        });
        assert_eq!(d.rationale, Rationale::PositiveTrend);
        assert_eq!((d.clock_delta, d.rise_delta, d.confidence), (1, -1, 70));
    }

    #[test]
    fn apply_delta_absorbs() {
        assert_eq!(apply_delta(0, -1), 0);
        assert_eq!(apply_delta(19, 1), 19);
        assert_eq!(apply_delta(7, 1), 8);
    }

    #[rstest::rstest]
    #[case(Rationale::CooldownActive, "cooldown active")]
    #[case(Rationale::HighErrorRate, "high error rate")]
    #[case(Rationale::PositiveTrend, "positive trend, optimizing speed")]
    #[case(Rationale::ModerateOptimization, "moderate optimization")]
    #[case(Rationale::RestoringBest, "restoring best configuration")]
    #[case(Rationale::ConsecutiveErrors, "consecutive errors")]
    #[case(Rationale::NoAdjustmentNeeded, "no adjustment needed")]
    fn rationale_tags(#[case] r: Rationale, #[case] tag: &str) {
        assert_eq!(r.as_str(), tag);
        assert_eq!(r.to_string(), tag);
    }
}
