//! Indicator validation: structural dedupe and statistical gates.

pub mod dsr;
pub mod paper_trading;
pub mod returns;
pub mod signature;
pub mod triggers;
pub mod walk_forward;

#[cfg(test)]
mod validation_tests;

pub use dsr::{
    deflated_sharpe_ratio, expected_max_sharpe, DeflatedSharpeInput, DeflatedSharpeResult,
    DsrInterpretation,
};
pub use paper_trading::{
    aggregate_paper_results, evaluate_paper_trading, trading_days_between, ActionConfidence,
    PaperAggregate, PaperTradingAction, PaperTradingConfig, PaperTradingEvaluation,
    PaperTradingInput, PaperTradingStatus,
};
pub use returns::{
    annualized_sharpe, mean, pearson_correlation, return_statistics, std_dev, ReturnStatistics,
    TRADING_DAYS_PER_YEAR,
};
pub use signature::{
    core_similarity, extract_cores, lcs_similarity, signature_from_source, similarity,
    SimilarityDecision, StructuralSignature,
};
pub use triggers::{
    ic_decay_days, should_trigger, TriggerDecision, TriggerInput, TriggerThresholds,
};
pub use walk_forward::{
    walk_forward, PeriodResult, WalkForwardConfig, WalkForwardMethod, WalkForwardResult,
    WalkForwardVerdict,
};

/// Contract-violation errors raised by the validation functions.
///
/// Statistical outcomes are never errors; only malformed inputs are.
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// Parallel series differ in length.
    SeriesLengthMismatch { expected: usize, actual: usize },
    /// Not enough observations for the requested computation.
    InsufficientData { required: usize, actual: usize },
    /// A parameter is outside its documented domain.
    InvalidParameter { name: String, message: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::SeriesLengthMismatch { expected, actual } => {
                write!(f, "series length mismatch: expected {}, got {}", expected, actual)
            }
            ValidationError::InsufficientData { required, actual } => {
                write!(f, "insufficient data: need {}, got {}", required, actual)
            }
            ValidationError::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{}': {}", name, message)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = Result<T, ValidationError>;
