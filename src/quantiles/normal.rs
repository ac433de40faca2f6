//! Normal-approximation quantiles
//!
//! Constant-memory quantile accumulator that assumes the observations are
//! normally distributed: it keeps a [`Tally`] and inverts the fitted
//! N(mean, stddev) distribution for quantile queries.

use crate::math::{inverse_standard_normal_cdf, standard_normal_cdf};
use crate::statistics::Tally;
use crate::traits::{Accumulator, MergeError, QuantileEstimator};

/// Parametric quantile accumulator under a normality assumption
///
/// Uses O(1) memory regardless of stream length. Accuracy depends entirely
/// on how normal the data actually are; for skewed or multi-modal data use
/// [`FullStorage`](crate::quantiles::FullStorage) or
/// [`TDigest`](crate::quantiles::TDigest) instead.
///
/// The fitted distribution uses the sample standard deviation. A stream
/// with zero variance (one observation, or all equal) degenerates to a
/// point mass at the mean.
///
/// # Example
///
/// ```
/// use statkit::quantiles::NormalApprox;
/// use statkit::traits::QuantileEstimator;
///
/// let mut approx = NormalApprox::new();
/// for i in 1..=100 {
///     approx.add(i as f64);
/// }
///
/// // Median of the fitted normal is the mean
/// assert!((approx.median().unwrap() - 50.5).abs() < 1e-9);
/// ```
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalApprox {
    tally: Tally,
}

impl NormalApprox {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self { tally: Tally::new() }
    }

    /// Register an observation
    ///
    /// NaN observations are ignored.
    pub fn add(&mut self, value: f64) {
        self.tally.add(value);
    }

    /// Get the number of observations
    pub fn len(&self) -> u64 {
        self.tally.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tally.is_empty()
    }

    /// Get the fitted mean
    pub fn mean(&self) -> f64 {
        self.tally.mean()
    }

    /// Get the fitted standard deviation (sample)
    pub fn stddev(&self) -> f64 {
        self.tally.sample_stddev()
    }

    /// Get read access to the underlying tally
    pub fn tally(&self) -> &Tally {
        &self.tally
    }
}

impl Accumulator for NormalApprox {
    type Observation = f64;

    fn register(&mut self, observation: &f64) {
        self.add(*observation);
    }

    fn merge(&mut self, other: &Self) -> Result<(), MergeError> {
        self.tally.combine(&other.tally);
        Ok(())
    }

    fn reset(&mut self) {
        self.tally.reset();
    }

    fn count(&self) -> u64 {
        self.tally.len()
    }
}

impl QuantileEstimator for NormalApprox {
    /// Quantile of the fitted normal distribution
    ///
    /// `quantile(0.0)` and `quantile(1.0)` are −∞ and +∞ when the fitted
    /// distribution has spread: the model has unbounded support.
    fn quantile(&self, p: f64) -> Option<f64> {
        if self.tally.is_empty() {
            return None;
        }

        let p = p.clamp(0.0, 1.0);
        let spread = self.stddev();
        if spread == 0.0 {
            return Some(self.tally.mean());
        }

        Some(self.tally.mean() + spread * inverse_standard_normal_cdf(p))
    }

    fn cumulative_probability(&self, value: f64) -> f64 {
        if value.is_nan() {
            return f64::NAN;
        }
        if self.tally.is_empty() {
            return 0.0;
        }

        let spread = self.stddev();
        if spread == 0.0 {
            // Point mass at the mean
            return if value >= self.tally.mean() { 1.0 } else { 0.0 };
        }

        standard_normal_cdf((value - self.tally.mean()) / spread)
    }

    fn min(&self) -> Option<f64> {
        self.tally.min()
    }

    fn max(&self) -> Option<f64> {
        self.tally.max()
    }
}
