//! Paper-trading evaluation.
//!
//! An indicator stays in progress until it has enough trading days on
//! paper, then passes or fails against its backtest expectations; the
//! verdict maps onto a lifecycle action.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

/// Gate configuration.
#[derive(Debug, Clone)]
pub struct PaperTradingConfig {
    /// Trading days required before a verdict.
    pub minimum_days: i64,
    /// Floor on realized/backtest Sharpe ratio.
    pub sharpe_tolerance: f64,
    /// Cap on realized/backtest drawdown ratio.
    pub max_drawdown_multiplier: f64,
}

impl Default for PaperTradingConfig {
    fn default() -> Self {
        Self {
            minimum_days: 30,
            sharpe_tolerance: 0.7,
            max_drawdown_multiplier: 2.0,
        }
    }
}

/// Realized paper metrics relative to backtest expectations.
#[derive(Debug, Clone)]
pub struct PaperTradingInput {
    pub indicator_id: String,
    pub start_date: NaiveDate,
    pub as_of: NaiveDate,
    /// Realized Sharpe divided by backtest Sharpe.
    pub sharpe_ratio: f64,
    /// Realized max drawdown divided by backtest max drawdown.
    pub drawdown_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperTradingStatus {
    InProgress,
    Passed,
    Failed,
}

/// Lifecycle action recommended by the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperTradingAction {
    Promote,
    Continue,
    Retire,
    Review,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionConfidence {
    High,
    Medium,
    Low,
}

/// Evaluation of one indicator's paper run.
#[derive(Debug, Clone, Serialize)]
pub struct PaperTradingEvaluation {
    pub indicator_id: String,
    pub status: PaperTradingStatus,
    pub action: PaperTradingAction,
    pub confidence: ActionConfidence,
    pub trading_days: i64,
    pub reason: String,
}

/// Ratios past which a failed run is retired outright.
const RETIRE_SHARPE_RATIO: f64 = 0.3;
const RETIRE_DRAWDOWN_RATIO: f64 = 3.0;

/// Count Mon–Fri days in `[start, end]`, inclusive. Zero when `end`
/// precedes `start`.
pub fn trading_days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    if end < start {
        return 0;
    }
    let mut days = 0;
    let mut current = start;
    while current <= end {
        match current.weekday() {
            Weekday::Sat | Weekday::Sun => {}
            _ => days += 1,
        }
        current = current.succ_opt().expect("date range stays in bounds");
    }
    days
}

/// Evaluate one paper run against the gate.
pub fn evaluate_paper_trading(
    input: &PaperTradingInput,
    config: &PaperTradingConfig,
) -> PaperTradingEvaluation {
    let trading_days = trading_days_between(input.start_date, input.as_of);

    if trading_days < config.minimum_days {
        return PaperTradingEvaluation {
            indicator_id: input.indicator_id.clone(),
            status: PaperTradingStatus::InProgress,
            action: PaperTradingAction::Continue,
            confidence: ActionConfidence::Low,
            trading_days,
            reason: format!(
                "{} of {} trading days elapsed",
                trading_days, config.minimum_days
            ),
        };
    }

    let sharpe_ok = input.sharpe_ratio >= config.sharpe_tolerance;
    let drawdown_ok = input.drawdown_ratio <= config.max_drawdown_multiplier;

    if sharpe_ok && drawdown_ok {
        return PaperTradingEvaluation {
            indicator_id: input.indicator_id.clone(),
            status: PaperTradingStatus::Passed,
            action: PaperTradingAction::Promote,
            confidence: ActionConfidence::High,
            trading_days,
            reason: format!(
                "sharpe ratio {:.2} and drawdown ratio {:.2} within tolerance",
                input.sharpe_ratio, input.drawdown_ratio
            ),
        };
    }

    let extreme =
        input.sharpe_ratio < RETIRE_SHARPE_RATIO || input.drawdown_ratio > RETIRE_DRAWDOWN_RATIO;
    let (action, confidence) = if extreme {
        (PaperTradingAction::Retire, ActionConfidence::High)
    } else {
        (PaperTradingAction::Review, ActionConfidence::Medium)
    };

    PaperTradingEvaluation {
        indicator_id: input.indicator_id.clone(),
        status: PaperTradingStatus::Failed,
        action,
        confidence,
        trading_days,
        reason: format!(
            "sharpe ratio {:.2} (floor {:.2}), drawdown ratio {:.2} (cap {:.2})",
            input.sharpe_ratio,
            config.sharpe_tolerance,
            input.drawdown_ratio,
            config.max_drawdown_multiplier
        ),
    }
}

/// Batch summary of paper evaluations.
#[derive(Debug, Clone, Serialize)]
pub struct PaperAggregate {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub in_progress: usize,
    /// Pass fraction over completed runs; zero when nothing completed.
    pub pass_rate: f64,
}

pub fn aggregate_paper_results(evaluations: &[PaperTradingEvaluation]) -> PaperAggregate {
    let passed = evaluations
        .iter()
        .filter(|e| e.status == PaperTradingStatus::Passed)
        .count();
    let failed = evaluations
        .iter()
        .filter(|e| e.status == PaperTradingStatus::Failed)
        .count();
    let in_progress = evaluations.len() - passed - failed;
    let completed = passed + failed;

    PaperAggregate {
        total: evaluations.len(),
        passed,
        failed,
        in_progress,
        pass_rate: if completed == 0 {
            0.0
        } else {
            passed as f64 / completed as f64
        },
    }
}
