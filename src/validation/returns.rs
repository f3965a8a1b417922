//! Shared return-series statistics.
//!
//! All variance-bearing estimators divide by `n − 1`; a standard deviation
//! below `1e-15` is treated as zero so flat series never explode a ratio.

use serde::Serialize;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Threshold under which a standard deviation counts as zero.
const STD_EPSILON: f64 = 1e-15;

pub fn mean(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().sum::<f64>() / series.len() as f64
}

/// Unbiased sample standard deviation.
pub fn std_dev(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let m = mean(series);
    let var = series.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (series.len() - 1) as f64;
    let std = var.sqrt();
    if std < STD_EPSILON {
        0.0
    } else {
        std
    }
}

/// Daily-return Sharpe annualized by √252. Zero when the deviation is zero.
pub fn annualized_sharpe(returns: &[f64]) -> f64 {
    let std = std_dev(returns);
    if std == 0.0 {
        return 0.0;
    }
    mean(returns) / std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Pearson correlation.
///
/// Mismatched lengths, short series, and constant series all correlate to
/// zero; this is a total function by contract.
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 2 {
        return 0.0;
    }
    let mean_a = mean(a);
    let mean_b = mean(b);
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a.sqrt() < STD_EPSILON || var_b.sqrt() < STD_EPSILON {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

/// Moment summary of a daily return series.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnStatistics {
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub sharpe: f64,
    pub annualized_sharpe: f64,
}

/// Compute the moment summary used by the statistical gates.
///
/// Kurtosis is the raw fourth standardized moment (3 for a Gaussian), the
/// form the deflation standard error expects.
pub fn return_statistics(returns: &[f64]) -> ReturnStatistics {
    let n = returns.len();
    let m = mean(returns);
    let std = std_dev(returns);

    let (skewness, kurtosis) = if std == 0.0 || n < 2 {
        (0.0, 3.0)
    } else {
        let m3 = returns.iter().map(|x| (x - m).powi(3)).sum::<f64>() / n as f64;
        let m4 = returns.iter().map(|x| (x - m).powi(4)).sum::<f64>() / n as f64;
        // Standardize with the population deviation for the higher moments.
        let pop_var = returns.iter().map(|x| (x - m).powi(2)).sum::<f64>() / n as f64;
        let pop_std = pop_var.sqrt();
        if pop_std < STD_EPSILON {
            (0.0, 3.0)
        } else {
            (m3 / pop_std.powi(3), m4 / pop_std.powi(4))
        }
    };

    let sharpe = if std == 0.0 { 0.0 } else { m / std };
    ReturnStatistics {
        n,
        mean: m,
        std_dev: std,
        skewness,
        kurtosis,
        sharpe,
        annualized_sharpe: sharpe * TRADING_DAYS_PER_YEAR.sqrt(),
    }
}
