// rust/position-core/src/normalize.rs

//! Z-score normalization of evaluation targets.
//!
//! Statistics use the sample standard deviation (n - 1 denominator).

use crate::error::{DataError, Result};

/// Mean and sample standard deviation of a fitted series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standardizer {
    pub mean: f64,
    pub std_dev: f64,
}

impl Standardizer {
    /// Fits to `values`.
    ///
    /// # Errors
    ///
    /// `DegenerateInput` for fewer than two values, non-finite values, or
    /// zero variance.
    pub fn fit(values: &[f64]) -> Result<Self> {
        if values.len() < 2 {
            return Err(DataError::degenerate_input(format!(
                "need at least 2 values to standardize, got {}",
                values.len()
            )));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(DataError::degenerate_input(format!(
                "non-finite value {bad}"
            )));
        }

        if values.iter().all(|&v| v == values[0]) {
            return Err(DataError::degenerate_input("values are constant"));
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let std_dev = variance.sqrt();
        if std_dev == 0.0 || !std_dev.is_finite() {
            return Err(DataError::degenerate_input(
                "values have zero variance",
            ));
        }
        Ok(Self { mean, std_dev })
    }

    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| (v - self.mean) / self.std_dev).collect()
    }

    pub fn inverse_transform(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| v * self.std_dev + self.mean).collect()
    }
}

/// `(x - mean(x)) / stddev(x)`.
pub fn standardize(values: &[f64]) -> Result<Vec<f64>> {
    Ok(Standardizer::fit(values)?.transform(values))
}

/// Maps `standardized` back to the scale of `original`.
pub fn destandardize(standardized: &[f64], original: &[f64]) -> Result<Vec<f64>> {
    Ok(Standardizer::fit(original)?.inverse_transform(standardized))
}
