//! Walk-forward validation.
//!
//! Splits the signal/return history into periods, trades the signal
//! out-of-sample in each, and reports the efficiency (out-of-sample vs
//! in-sample Sharpe) and consistency of the result.

use serde::Serialize;
use tracing::debug;

use crate::validation::returns::annualized_sharpe;
use crate::validation::{ValidationError, ValidationResult};

/// Windowing scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WalkForwardMethod {
    /// Disjoint windows of equal size.
    Rolling,
    /// Windows growing from the first observation.
    Anchored,
}

/// Walk-forward configuration.
#[derive(Debug, Clone)]
pub struct WalkForwardConfig {
    pub n_periods: usize,
    /// Fraction of each window used for training.
    pub train_ratio: f64,
    pub method: WalkForwardMethod,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            n_periods: 4,
            train_ratio: 0.7,
            method: WalkForwardMethod::Rolling,
        }
    }
}

/// Minimum observations each period must contain.
const MIN_OBSERVATIONS_PER_PERIOD: usize = 20;

/// One evaluated period.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodResult {
    pub period: usize,
    pub train_len: usize,
    pub test_len: usize,
    pub is_sharpe: f64,
    pub oos_sharpe: f64,
    pub efficiency: f64,
}

/// Aggregate verdict bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WalkForwardVerdict {
    Robust,
    Marginal,
    Overfit,
}

/// Walk-forward output.
#[derive(Debug, Clone, Serialize)]
pub struct WalkForwardResult {
    pub periods: Vec<PeriodResult>,
    pub efficiency: f64,
    pub consistency: f64,
    pub interpretation: WalkForwardVerdict,
    pub passed: bool,
}

/// Run walk-forward validation of `signals` against `returns`.
///
/// Strategy returns are `rₜ · sign(sₜ)`. Periods whose train or test side
/// has fewer than two observations are skipped rather than failing; a
/// degenerate train ratio simply leaves nothing evaluable.
pub fn walk_forward(
    returns: &[f64],
    signals: &[f64],
    config: &WalkForwardConfig,
) -> ValidationResult<WalkForwardResult> {
    if signals.len() != returns.len() {
        return Err(ValidationError::SeriesLengthMismatch {
            expected: returns.len(),
            actual: signals.len(),
        });
    }
    if config.n_periods < 2 {
        return Err(ValidationError::InvalidParameter {
            name: "n_periods".to_string(),
            message: format!("need at least 2 periods, got {}", config.n_periods),
        });
    }
    if !(0.0..=1.0).contains(&config.train_ratio) {
        return Err(ValidationError::InvalidParameter {
            name: "train_ratio".to_string(),
            message: format!("must lie in [0, 1], got {}", config.train_ratio),
        });
    }
    let period_len = returns.len() / config.n_periods;
    if period_len < MIN_OBSERVATIONS_PER_PERIOD {
        return Err(ValidationError::InsufficientData {
            required: MIN_OBSERVATIONS_PER_PERIOD * config.n_periods,
            actual: returns.len(),
        });
    }

    let strategy: Vec<f64> = returns
        .iter()
        .zip(signals.iter())
        .map(|(r, s)| r * s.signum())
        .collect();

    let mut periods = Vec::new();
    for i in 0..config.n_periods {
        let (start, end) = match config.method {
            WalkForwardMethod::Rolling => (i * period_len, (i + 1) * period_len),
            WalkForwardMethod::Anchored => (0, (i + 1) * period_len),
        };
        let window = &strategy[start..end];
        let split = (window.len() as f64 * config.train_ratio) as usize;
        let (train, test) = window.split_at(split.min(window.len()));
        if train.len() < 2 || test.len() < 2 {
            debug!(period = i, train = train.len(), test = test.len(), "period skipped");
            continue;
        }

        let is_sharpe = annualized_sharpe(train);
        let oos_sharpe = annualized_sharpe(test);
        let efficiency = if is_sharpe == 0.0 {
            0.0
        } else {
            oos_sharpe / is_sharpe
        };
        periods.push(PeriodResult {
            period: i,
            train_len: train.len(),
            test_len: test.len(),
            is_sharpe,
            oos_sharpe,
            efficiency,
        });
    }

    let (efficiency, consistency) = if periods.is_empty() {
        (0.0, 0.0)
    } else {
        let mean_is = periods.iter().map(|p| p.is_sharpe).sum::<f64>() / periods.len() as f64;
        let mean_oos = periods.iter().map(|p| p.oos_sharpe).sum::<f64>() / periods.len() as f64;
        let efficiency = if mean_is == 0.0 { 0.0 } else { mean_oos / mean_is };
        let positive = periods.iter().filter(|p| p.oos_sharpe > 0.0).count();
        (efficiency, positive as f64 / periods.len() as f64)
    };

    let interpretation = if efficiency >= 0.5 && consistency >= 0.6 {
        WalkForwardVerdict::Robust
    } else if efficiency >= 0.3 && consistency >= 0.4 {
        WalkForwardVerdict::Marginal
    } else {
        WalkForwardVerdict::Overfit
    };

    Ok(WalkForwardResult {
        periods,
        efficiency,
        consistency,
        interpretation,
        passed: interpretation == WalkForwardVerdict::Robust,
    })
}
