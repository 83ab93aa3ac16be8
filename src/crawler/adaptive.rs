//! Adaptive link-density threshold
//!
//! The engine feeds the running fetch success rate in every few pages. A
//! struggling crawl lowers the threshold so more areas count as dense; a
//! healthy one raises it. The value never leaves its configured bounds.

use crate::config::AdaptiveConfig;
use std::fmt;

/// Result of one adaptation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Lowered { from: u32, to: u32 },
    Raised { from: u32, to: u32 },
    Unchanged,
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lowered { from, to } => write!(f, "lowered {} -> {}", from, to),
            Self::Raised { from, to } => write!(f, "raised {} -> {}", from, to),
            Self::Unchanged => f.write_str("unchanged"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdaptiveThreshold {
    value: u32,
    min: u32,
    max: u32,
    step: u32,
    low_rate: f64,
    high_rate: f64,
}

impl AdaptiveThreshold {
    pub fn new(config: &AdaptiveConfig) -> Self {
        let min = config.min_threshold.min(config.max_threshold);
        let max = config.max_threshold.max(config.min_threshold);

        Self {
            value: config.initial_threshold.clamp(min, max),
            min,
            max,
            step: config.step.max(1),
            low_rate: config.low_success_rate,
            high_rate: config.high_success_rate,
        }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn bounds(&self) -> (u32, u32) {
        (self.min, self.max)
    }

    /// Moves the threshold one step according to `success_rate`
    ///
    /// Below the low rate the threshold drops (looser promotion), above the
    /// high rate it rises (stricter). A NaN rate changes nothing.
    pub fn adapt(&mut self, success_rate: f64) -> Adjustment {
        let from = self.value;

        if success_rate < self.low_rate {
            self.value = self.value.saturating_sub(self.step).max(self.min);
        } else if success_rate > self.high_rate {
            self.value = self.value.saturating_add(self.step).min(self.max);
        }

        match self.value.cmp(&from) {
            std::cmp::Ordering::Less => Adjustment::Lowered {
                from,
                to: self.value,
            },
            std::cmp::Ordering::Greater => Adjustment::Raised {
                from,
                to: self.value,
            },
            std::cmp::Ordering::Equal => Adjustment::Unchanged,
        }
    }
}
