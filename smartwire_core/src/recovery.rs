//! Tiered recovery after repeated transaction failures.

use crate::config::RANGE_STEPS;

/// Recent fault ring percentage at which the adaptive tier escalates.
pub const ESCALATION_ERROR_RATE: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryState {
    #[default]
    Normal,
    Incremental,
    Adaptive,
    Emergency,
}

impl RecoveryState {
    pub fn as_str(self) -> &'static str {
        match self {
            RecoveryState::Normal => "normal",
            RecoveryState::Incremental => "incremental",
            RecoveryState::Adaptive => "adaptive",
            RecoveryState::Emergency => "emergency",
        }
    }

    /// Transient tiers clear on the next success; emergency is sticky.
    pub fn after_success(self) -> Self {
        match self {
            RecoveryState::Emergency => RecoveryState::Emergency,
            _ => RecoveryState::Normal,
        }
    }
}

/// Tier selection by priority: emergency, then adaptive, then incremental.
pub fn select_tier(emergency_enabled: bool, adaptive: bool) -> RecoveryState {
    if emergency_enabled {
        RecoveryState::Emergency
    } else if adaptive {
        RecoveryState::Adaptive
    } else {
        RecoveryState::Incremental
    }
}

/// Target configuration computed for one threshold breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPlan {
    /// Tier actually executed (adaptive may escalate).
    pub tier: RecoveryState,
    pub clock_step: u8,
    pub rise_step: u8,
}

impl RecoveryPlan {
    pub fn is_emergency(&self) -> bool {
        self.tier == RecoveryState::Emergency
    }
}

/// Resolve `tier` against the current steps.
pub fn plan(tier: RecoveryState, recent_error_rate: f32, clock_step: u8, rise_step: u8) -> RecoveryPlan {
    let max = RANGE_STEPS - 1;
    let emergency = RecoveryPlan {
        tier: RecoveryState::Emergency,
        clock_step: 0,
        rise_step: max,
    };
    match tier {
        RecoveryState::Emergency => emergency,
        RecoveryState::Adaptive if recent_error_rate >= ESCALATION_ERROR_RATE => emergency,
        RecoveryState::Adaptive => RecoveryPlan {
            tier,
            clock_step: clock_step.saturating_sub(1),
            rise_step: (rise_step + 1).min(max),
        },
        RecoveryState::Incremental | RecoveryState::Normal => RecoveryPlan {
            tier: RecoveryState::Incremental,
            clock_step: clock_step.saturating_sub(1),
            rise_step,
        },
    }
}
