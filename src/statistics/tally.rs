//! Moment-based statistics (mean, variance, skewness, kurtosis, min, max)
//!
//! Computes streaming statistics using Welford's numerically stable online
//! algorithm, extended through the fourth central moment. Supports merging
//! for parallel computation.

use crate::math::inverse_standard_normal_cdf;
use crate::traits::{Accumulator, ConfidenceInterval, MergeError};

/// Streaming statistics accumulator through the fourth moment
///
/// Computes count, sum, mean, variance, standard deviation, skewness,
/// kurtosis, min, and max in a single pass with O(1) memory. Central
/// moments are maintained with Welford-style updates to avoid catastrophic
/// cancellation.
///
/// # Example
///
/// ```
/// use statkit::statistics::Tally;
///
/// let mut tally = Tally::new();
///
/// for value in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
///     tally.add(value);
/// }
///
/// assert!((tally.mean() - 5.0).abs() < 0.001);
/// assert!((tally.variance() - 4.0).abs() < 0.001);
/// assert!((tally.stddev() - 2.0).abs() < 0.001);
/// assert_eq!(tally.min(), Some(2.0));
/// assert_eq!(tally.max(), Some(9.0));
/// ```
///
/// # Parallel Usage
///
/// ```
/// use statkit::statistics::Tally;
/// use statkit::traits::Accumulator;
///
/// let mut left = Tally::new();
/// let mut right = Tally::new();
///
/// for v in [1.0, 2.0, 3.0] {
///     left.add(v);
/// }
/// for v in [4.0, 5.0, 6.0] {
///     right.add(v);
/// }
///
/// left.merge(&right).unwrap();
/// assert!((left.mean() - 3.5).abs() < 0.001);
/// ```
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tally {
    /// Number of observations
    count: u64,
    /// Running mean
    mean: f64,
    /// Second central moment: sum of squared deviations from the mean
    m2: f64,
    /// Third central moment sum
    m3: f64,
    /// Fourth central moment sum
    m4: f64,
    /// Minimum observation
    min: f64,
    /// Maximum observation
    max: f64,
}

impl Default for Tally {
    fn default() -> Self {
        Self::new()
    }
}

impl Tally {
    /// Create a new empty tally
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            m3: 0.0,
            m4: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Register an observation
    ///
    /// Uses Welford's online algorithm extended through the fourth moment.
    /// NaN observations are ignored to prevent poisoning the statistics.
    pub fn add(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }

        let n0 = self.count as f64;
        self.count += 1;
        let n = self.count as f64;

        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }

        let delta = value - self.mean;
        let delta_n = delta / n;
        let delta_n2 = delta_n * delta_n;
        let term = delta * delta_n * n0;

        self.mean += delta_n;
        self.m4 += term * delta_n2 * (n * n - 3.0 * n + 3.0) + 6.0 * delta_n2 * self.m2
            - 4.0 * delta_n * self.m3;
        self.m3 += term * delta_n * (n - 2.0) - 3.0 * delta_n * self.m2;
        self.m2 += term;
    }

    /// Get the number of observations
    pub fn len(&self) -> u64 {
        self.count
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Get the sum of all observations
    pub fn sum(&self) -> f64 {
        self.mean * self.count as f64
    }

    /// Get the mean
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Get the population variance
    ///
    /// Use [`sample_variance`](Self::sample_variance) if the observations
    /// are a sample of a larger population.
    pub fn variance(&self) -> f64 {
        if self.count < 1 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    /// Get the sample variance (Bessel's correction)
    pub fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Get the population standard deviation
    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Get the sample standard deviation
    pub fn sample_stddev(&self) -> f64 {
        self.sample_variance().sqrt()
    }

    /// Get the population skewness
    ///
    /// √n · M3 / M2^1.5. Zero for empty, constant, or single-observation
    /// streams.
    pub fn skewness(&self) -> f64 {
        if self.count == 0 || self.m2 <= 0.0 {
            return 0.0;
        }
        let n = self.count as f64;
        n.sqrt() * self.m3 / self.m2.powf(1.5)
    }

    /// Get the sample skewness (adjusted Fisher-Pearson)
    ///
    /// Requires at least 3 observations; zero otherwise.
    pub fn sample_skewness(&self) -> f64 {
        if self.count < 3 {
            return 0.0;
        }
        let n = self.count as f64;
        self.skewness() * (n * (n - 1.0)).sqrt() / (n - 2.0)
    }

    /// Get the population kurtosis
    ///
    /// n · M4 / M2². The normal distribution has kurtosis 3. Zero for
    /// empty or constant streams.
    pub fn kurtosis(&self) -> f64 {
        if self.count == 0 || self.m2 <= 0.0 {
            return 0.0;
        }
        let n = self.count as f64;
        n * self.m4 / (self.m2 * self.m2)
    }

    /// Get the excess kurtosis (kurtosis − 3)
    pub fn excess_kurtosis(&self) -> f64 {
        if self.count == 0 || self.m2 <= 0.0 {
            return 0.0;
        }
        self.kurtosis() - 3.0
    }

    /// Get the minimum observation
    pub fn min(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.min)
        }
    }

    /// Get the maximum observation
    pub fn max(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.max)
        }
    }

    /// Get the range (max − min)
    pub fn range(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.max - self.min)
        }
    }

    /// Get a normal-approximation confidence interval around the mean
    ///
    /// Uses the standard error of the mean with the sample standard
    /// deviation: mean ± z · s/√n, where z is the two-sided normal
    /// quantile for the requested confidence level.
    ///
    /// Returns `None` when empty. A single observation yields a degenerate
    /// interval at the mean.
    ///
    /// # Panics
    ///
    /// Panics if `confidence` is not strictly between 0 and 1.
    pub fn confidence_interval(&self, confidence: f64) -> Option<ConfidenceInterval> {
        assert!(
            confidence > 0.0 && confidence < 1.0,
            "confidence must be in (0, 1), got {}",
            confidence
        );

        if self.count == 0 {
            return None;
        }

        let z = inverse_standard_normal_cdf(0.5 + confidence / 2.0);
        let half_width = z * self.sample_stddev() / (self.count as f64).sqrt();
        Some(ConfidenceInterval::new(
            self.mean - half_width,
            self.mean,
            self.mean + half_width,
            confidence,
        ))
    }

    /// Merge with another tally using the pairwise moment-combination formulas
    ///
    /// Combines counts, means, and central moments through the fourth order
    /// (Chan et al. / Pébay).
    pub fn combine(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }

        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;

        let delta = other.mean - self.mean;
        let delta2 = delta * delta;
        let delta3 = delta2 * delta;
        let delta4 = delta2 * delta2;

        let mean = self.mean + delta * nb / n;
        let m2 = self.m2 + other.m2 + delta2 * na * nb / n;
        let m3 = self.m3
            + other.m3
            + delta3 * na * nb * (na - nb) / (n * n)
            + 3.0 * delta * (na * other.m2 - nb * self.m2) / n;
        let m4 = self.m4
            + other.m4
            + delta4 * na * nb * (na * na - na * nb + nb * nb) / (n * n * n)
            + 6.0 * delta2 * (na * na * other.m2 + nb * nb * self.m2) / (n * n)
            + 4.0 * delta * (na * other.m3 - nb * self.m3) / n;

        self.count += other.count;
        self.mean = mean;
        self.m2 = m2;
        self.m3 = m3;
        self.m4 = m4;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

impl Accumulator for Tally {
    type Observation = f64;

    fn register(&mut self, observation: &f64) {
        self.add(*observation);
    }

    fn merge(&mut self, other: &Self) -> Result<(), MergeError> {
        self.combine(other);
        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn count(&self) -> u64 {
        self.count
    }
}
