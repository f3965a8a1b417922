//! Deflated Sharpe Ratio.
//!
//! Deflates an observed Sharpe by the maximum expected under the Gaussian
//! null given how many configurations were tried, then scores the residual
//! against the moment-adjusted standard error.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

use crate::validation::{ValidationError, ValidationResult};

/// Inputs to the deflation test.
#[derive(Debug, Clone)]
pub struct DeflatedSharpeInput {
    /// Observed (non-annualized) Sharpe ratio.
    pub sharpe: f64,
    /// Number of trials behind the selected configuration.
    pub n_trials: usize,
    /// Number of return observations.
    pub n_observations: usize,
    pub skewness: f64,
    /// Raw fourth standardized moment (3 for a Gaussian).
    pub kurtosis: f64,
}

/// Verdict bands over the deflation probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DsrInterpretation {
    Significant,
    Questionable,
    LikelyChance,
}

impl DsrInterpretation {
    pub fn as_str(&self) -> &'static str {
        match self {
            DsrInterpretation::Significant => "significant",
            DsrInterpretation::Questionable => "questionable",
            DsrInterpretation::LikelyChance => "likely_chance",
        }
    }
}

/// Full deflation output.
#[derive(Debug, Clone, Serialize)]
pub struct DeflatedSharpeResult {
    pub expected_max_sharpe: f64,
    pub deflated_sharpe: f64,
    pub standard_error: f64,
    pub z_score: f64,
    /// Φ(z): probability the observed Sharpe beats the null maximum.
    pub probability: f64,
    pub p_value: f64,
    pub interpretation: DsrInterpretation,
    pub passed: bool,
}

fn std_normal() -> Normal {
    Normal::new(0.0, 1.0).expect("standard normal parameters are valid")
}

/// Expected maximum Sharpe among `n_trials` independent null trials.
///
/// Quantile approximation of the Gaussian extreme value: `Φ⁻¹(1 − 1/N)`.
/// One trial deflates nothing; the value grows monotonically in N and
/// reaches ≈ 1.0 near seven trials.
pub fn expected_max_sharpe(n_trials: usize) -> f64 {
    if n_trials <= 1 {
        return 0.0;
    }
    std_normal().inverse_cdf(1.0 - 1.0 / n_trials as f64)
}

/// Run the deflation test.
pub fn deflated_sharpe_ratio(input: &DeflatedSharpeInput) -> ValidationResult<DeflatedSharpeResult> {
    if input.n_observations < 2 {
        return Err(ValidationError::InsufficientData {
            required: 2,
            actual: input.n_observations,
        });
    }
    if input.n_trials == 0 {
        return Err(ValidationError::InvalidParameter {
            name: "n_trials".to_string(),
            message: "at least one trial is required".to_string(),
        });
    }

    let sr = input.sharpe;
    let variance_term =
        1.0 - input.skewness * sr + (input.kurtosis - 1.0) / 4.0 * sr * sr;
    if variance_term <= 0.0 {
        return Err(ValidationError::InvalidParameter {
            name: "moments".to_string(),
            message: format!(
                "non-positive Sharpe variance ({:.6}) from skew {:.3}, kurt {:.3}",
                variance_term, input.skewness, input.kurtosis
            ),
        });
    }
    let standard_error = (variance_term / (input.n_observations - 1) as f64).sqrt();

    let expected_max = expected_max_sharpe(input.n_trials);
    let deflated = sr - expected_max;
    let z_score = deflated / standard_error;
    let probability = std_normal().cdf(z_score);
    let p_value = 1.0 - probability;

    let interpretation = if probability >= 0.95 {
        DsrInterpretation::Significant
    } else if probability < 0.5 {
        DsrInterpretation::LikelyChance
    } else {
        DsrInterpretation::Questionable
    };

    Ok(DeflatedSharpeResult {
        expected_max_sharpe: expected_max,
        deflated_sharpe: deflated,
        standard_error,
        z_score,
        probability,
        p_value,
        interpretation,
        passed: probability >= 0.95,
    })
}
