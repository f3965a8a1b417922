//! Cross-module validation scenarios: a candidate indicator walked
//! through the full statistical gate sequence.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::validation::dsr::{deflated_sharpe_ratio, DeflatedSharpeInput, DsrInterpretation};
use crate::validation::paper_trading::{
    aggregate_paper_results, evaluate_paper_trading, PaperTradingAction, PaperTradingConfig,
    PaperTradingInput, PaperTradingStatus,
};
use crate::validation::returns::return_statistics;
use crate::validation::signature::{core_similarity, SimilarityDecision};
use crate::validation::triggers::{should_trigger, TriggerInput, TriggerThresholds};
use crate::validation::walk_forward::{walk_forward, WalkForwardConfig};

/// Daily returns with a real edge plus noise, seeded for determinism.
fn edge_returns(n: usize, edge: f64, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut returns = Vec::with_capacity(n);
    let mut signals = Vec::with_capacity(n);
    for _ in 0..n {
        let signal: f64 = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        returns.push(signal * edge + rng.gen_range(-0.008..0.008));
        signals.push(signal);
    }
    (returns, signals)
}

#[test]
fn genuine_edge_clears_the_full_gate_sequence() {
    let (returns, signals) = edge_returns(504, 0.008, 3);

    // Strategy returns as walk-forward sees them.
    let strategy: Vec<f64> = returns
        .iter()
        .zip(signals.iter())
        .map(|(r, s)| r * s.signum())
        .collect();
    let stats = return_statistics(&strategy);
    assert!(stats.annualized_sharpe > 1.0, "edge should be tradeable");

    let dsr = deflated_sharpe_ratio(&DeflatedSharpeInput {
        sharpe: stats.sharpe,
        n_trials: 5,
        n_observations: stats.n,
        skewness: stats.skewness,
        kurtosis: stats.kurtosis,
    })
    .unwrap();
    assert!(dsr.passed, "probability {:.4}", dsr.probability);

    let wf = walk_forward(&returns, &signals, &WalkForwardConfig::default()).unwrap();
    assert!(wf.passed, "efficiency {:.2}", wf.efficiency);
}

#[test]
fn pure_noise_fails_deflation_under_many_trials() {
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let returns: Vec<f64> = (0..252).map(|_| rng.gen_range(-0.01..0.01)).collect();
    let stats = return_statistics(&returns);

    let dsr = deflated_sharpe_ratio(&DeflatedSharpeInput {
        sharpe: stats.sharpe,
        n_trials: 200,
        n_observations: stats.n,
        skewness: stats.skewness,
        kurtosis: stats.kurtosis,
    })
    .unwrap();
    assert!(!dsr.passed);
    assert_eq!(dsr.interpretation, DsrInterpretation::LikelyChance);
}

#[test]
fn near_duplicate_source_is_rejected_before_statistics_run() {
    let existing = r#"
        function momentumSignal(prices) {
            const fast = sma(prices, 5);
            const slow = sma(prices, 20);
            return fast > slow ? 1 : -1;
        }
    "#;
    let candidate = r#"
        function trendSignal(bars) {
            const quick = sma(bars, 10);
            const lazy = sma(bars, 50);
            return quick > lazy ? 1 : -1;
        }
    "#;
    let s = core_similarity(existing, candidate);
    assert_eq!(SimilarityDecision::from_similarity(s), SimilarityDecision::Reject);
}

#[test]
fn paper_cohort_feeds_capacity_aware_trigger() {
    use chrono::NaiveDate;
    let config = PaperTradingConfig::default();
    let start = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
    let as_of = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

    let evals: Vec<_> = [
        ("ind-keep", 0.9, 1.2),
        ("ind-drop", 0.1, 3.4),
    ]
    .into_iter()
    .map(|(id, sharpe, dd)| {
        evaluate_paper_trading(
            &PaperTradingInput {
                indicator_id: id.to_string(),
                start_date: start,
                as_of,
                sharpe_ratio: sharpe,
                drawdown_ratio: dd,
            },
            &config,
        )
    })
    .collect();

    assert_eq!(evals[0].status, PaperTradingStatus::Passed);
    assert_eq!(evals[1].action, PaperTradingAction::Retire);
    let agg = aggregate_paper_results(&evals);
    assert_eq!(agg.pass_rate, 0.5);

    // With a retirement freeing capacity, the generation trigger fires.
    let decision = should_trigger(
        &TriggerInput {
            regime_gap_detected: true,
            rolling_ic_30day: 0.015,
            ic_decay_days: 6,
            days_since_last_attempt: 40,
            active_indicator_count: agg.passed,
            max_indicator_capacity: 20,
        },
        &TriggerThresholds::default(),
    );
    assert!(decision.should_trigger);
}
