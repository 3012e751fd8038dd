//! Bounded histories: score snapshots for trend/stability and the fault ring.

use std::collections::VecDeque;

use crate::config::{ERROR_HISTORY_LEN, LEARNING_WINDOW};
use crate::fault::BusFault;
use crate::metrics::{PerformanceMetrics, score};

/// Fewer snapshots than this yield a neutral trend and stability.
pub const MIN_SAMPLES: usize = 3;
/// Stability reported before enough snapshots exist.
pub const NEUTRAL_STABILITY: f32 = 50.0;

/// Metrics captured at a decision checkpoint.
///
/// `score` is the controller's score at push time and is kept for
/// diagnostics only; trend and stability rescore `metrics`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub metrics: PerformanceMetrics,
    pub score: f32,
}

/// FIFO of the last `LEARNING_WINDOW` snapshots, oldest first.
#[derive(Debug, Clone)]
pub struct History {
    samples: VecDeque<Snapshot>,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(LEARNING_WINDOW),
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        if self.samples.len() == LEARNING_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(snapshot);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.samples.iter()
    }

    /// Every snapshot scored with the same stability term, which then
    /// cancels out of deltas and spread.
    fn rescored(&self, stability: f32) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().map(move |s| score(&s.metrics, stability))
    }

    /// Mean of consecutive score deltas; positive means improving.
    pub fn trend(&self) -> f32 {
        let n = self.samples.len();
        if n < MIN_SAMPLES {
            return 0.0;
        }
        let scores: Vec<f32> = self.rescored(self.stability()).collect();
        let sum: f32 = scores.windows(2).map(|w| w[1] - w[0]).sum();
        sum / (n - 1) as f32
    }

    /// `100 - stddev(scores)`, floored at 0.
    pub fn stability(&self) -> f32 {
        let n = self.samples.len();
        if n < MIN_SAMPLES {
            return NEUTRAL_STABILITY;
        }
        let scores: Vec<f32> = self.rescored(NEUTRAL_STABILITY).collect();
        let mean = scores.iter().sum::<f32>() / n as f32;
        let variance = scores
            .iter()
            .map(|s| {
                let d = s - mean;
                d * d
            })
            .sum::<f32>()
            / n as f32;
        (100.0 - variance.sqrt()).max(0.0)
    }
}

/// Ring of the last `ERROR_HISTORY_LEN` transaction classifications.
#[derive(Debug, Clone)]
pub struct ErrorHistory {
    slots: [BusFault; ERROR_HISTORY_LEN],
    next: usize,
}

impl Default for ErrorHistory {
    fn default() -> Self {
        Self {
            slots: [BusFault::None; ERROR_HISTORY_LEN],
            next: 0,
        }
    }
}

impl ErrorHistory {
    pub fn record(&mut self, fault: BusFault) {
        self.slots[self.next] = fault;
        self.next = (self.next + 1) % ERROR_HISTORY_LEN;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Number of non-`None` slots.
    pub fn faults(&self) -> usize {
        self.slots.iter().filter(|f| f.is_fault()).count()
    }

    /// Percentage of the ring occupied by faults.
    pub fn recent_error_rate(&self) -> f32 {
        100.0 * self.faults() as f32 / ERROR_HISTORY_LEN as f32
    }
}
