//! New-indicator generation triggers.
//!
//! Generation is expensive, so every gate must agree: a regime gap, weak
//! current ICs, sustained decay, an elapsed cooldown, and spare capacity.

use serde::Serialize;
use tracing::debug;

/// Trigger thresholds.
#[derive(Debug, Clone)]
pub struct TriggerThresholds {
    /// Rolling 30-day IC below this counts as weak.
    pub ic_floor: f64,
    /// Consecutive decay days required.
    pub decay_days: usize,
    /// Cooldown between generation attempts.
    pub cooldown_days: i64,
}

impl Default for TriggerThresholds {
    fn default() -> Self {
        Self {
            ic_floor: 0.02,
            decay_days: 5,
            cooldown_days: 30,
        }
    }
}

/// Snapshot of the signals feeding the trigger decision.
#[derive(Debug, Clone)]
pub struct TriggerInput {
    pub regime_gap_detected: bool,
    pub rolling_ic_30day: f64,
    pub ic_decay_days: usize,
    pub days_since_last_attempt: i64,
    pub active_indicator_count: usize,
    pub max_indicator_capacity: usize,
}

/// Trigger verdict with the blocking reasons when negative.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerDecision {
    pub should_trigger: bool,
    pub reasons: Vec<String>,
}

/// Length of the decaying tail of an IC history, newest first.
///
/// An entry continues the run when it is below the threshold or strictly
/// less than the chronologically previous (next-listed) entry.
pub fn ic_decay_days(history_newest_first: &[f64], threshold: f64) -> usize {
    let mut run = 0;
    for (i, value) in history_newest_first.iter().enumerate() {
        let below = *value < threshold;
        let declining = history_newest_first
            .get(i + 1)
            .map(|older| value < older)
            .unwrap_or(false);
        if below || declining {
            run += 1;
        } else {
            break;
        }
    }
    run
}

/// Decide whether to trigger indicator generation.
pub fn should_trigger(input: &TriggerInput, thresholds: &TriggerThresholds) -> TriggerDecision {
    let mut reasons = Vec::new();

    if !input.regime_gap_detected {
        reasons.push("No regime gap detected".to_string());
    }
    let ic_weak = input.rolling_ic_30day < thresholds.ic_floor;
    let decay_long = input.ic_decay_days >= thresholds.decay_days;
    if !ic_weak && !decay_long {
        reasons.push("Existing indicators are performing".to_string());
    }
    if !ic_weak {
        reasons.push(format!(
            "Rolling IC {:.4} above floor {:.4}",
            input.rolling_ic_30day, thresholds.ic_floor
        ));
    }
    if !decay_long {
        reasons.push(format!(
            "IC decay {} days below {} required",
            input.ic_decay_days, thresholds.decay_days
        ));
    }
    if input.days_since_last_attempt < thresholds.cooldown_days {
        reasons.push("Cooldown not met".to_string());
    }
    if input.active_indicator_count >= input.max_indicator_capacity {
        reasons.push("At indicator capacity".to_string());
    }

    let decision = TriggerDecision {
        should_trigger: reasons.is_empty(),
        reasons,
    };
    debug!(
        trigger = decision.should_trigger,
        blocking = decision.reasons.len(),
        "generation trigger evaluated"
    );
    decision
}
