//! Core traits for streaming accumulators
//!
//! All accumulators implement the base [`Accumulator`] trait, with the
//! specialized [`QuantileEstimator`] trait for the quantile strategies.

use std::fmt::Debug;

/// Error during accumulator merge operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// Accumulators have incompatible configurations
    IncompatibleConfig {
        expected: String,
        found: String,
    },
}

impl std::fmt::Display for MergeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeError::IncompatibleConfig { expected, found } => {
                write!(f, "incompatible config: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for MergeError {}

/// Symmetric confidence interval around an estimated mean
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfidenceInterval {
    /// Lower bound of the interval
    pub lower: f64,
    /// Point estimate (the mean)
    pub mean: f64,
    /// Upper bound of the interval
    pub upper: f64,
    /// Confidence level (e.g., 0.95 for 95%)
    pub confidence: f64,
}

impl ConfidenceInterval {
    /// Create a new confidence interval
    pub fn new(lower: f64, mean: f64, upper: f64, confidence: f64) -> Self {
        Self {
            lower,
            mean,
            upper,
            confidence,
        }
    }

    /// Check if a value falls within the interval
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// Width of the interval
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Relative width (width / mean)
    pub fn relative_width(&self) -> f64 {
        if self.mean == 0.0 {
            0.0
        } else {
            self.width() / self.mean
        }
    }
}

/// Core trait for all streaming accumulators
///
/// An accumulator summarizes a sequence of observations in a single pass.
/// Partial accumulators over a partitioned stream can be combined with
/// [`merge`](Accumulator::merge), yielding the same summary (within floating
/// point) as one accumulator over the whole stream.
pub trait Accumulator: Clone + Debug {
    /// The type of observation this accumulator processes
    type Observation: ?Sized;

    /// Register an observation
    fn register(&mut self, observation: &Self::Observation);

    /// Merge another accumulator into this one
    ///
    /// Returns an error if the accumulators are incompatible
    fn merge(&mut self, other: &Self) -> Result<(), MergeError>;

    /// Reset to the freshly constructed state
    fn reset(&mut self);

    /// Number of observations registered
    fn count(&self) -> u64;

    /// Check if no observations have been registered
    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Quantile accumulator strategies
///
/// A quantile estimator answers probability/value queries over the
/// distribution of its observations, either by storing all values (exact)
/// or by summarizing them (parametric or sketched).
pub trait QuantileEstimator: Accumulator<Observation = f64> {
    /// Get the value at cumulative probability `p` (0.0 to 1.0)
    ///
    /// `p = 0.5` returns the median. Returns `None` when empty.
    fn quantile(&self, p: f64) -> Option<f64>;

    /// Get the cumulative probability of a value (0.0 to 1.0)
    ///
    /// The empirical or modeled P(X ≤ value).
    fn cumulative_probability(&self, value: f64) -> f64;

    /// Get the minimum value seen
    fn min(&self) -> Option<f64>;

    /// Get the maximum value seen
    fn max(&self) -> Option<f64>;

    /// Get the median (50th percentile)
    fn median(&self) -> Option<f64> {
        self.quantile(0.5)
    }

    /// Get multiple quantiles at once
    fn quantiles(&self, probabilities: &[f64]) -> Vec<Option<f64>> {
        probabilities.iter().map(|&p| self.quantile(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_interval() {
        let interval = ConfidenceInterval::new(90.0, 100.0, 110.0, 0.95);

        assert!(interval.contains(100.0));
        assert!(interval.contains(90.0));
        assert!(interval.contains(110.0));
        assert!(!interval.contains(89.0));
        assert!(!interval.contains(111.0));

        assert_eq!(interval.width(), 20.0);
        assert!((interval.relative_width() - 0.2).abs() < 0.001);
    }

    #[test]
    fn test_merge_error_display() {
        let err = MergeError::IncompatibleConfig {
            expected: "compression=100".to_string(),
            found: "compression=200".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("compression=100"));
        assert!(msg.contains("compression=200"));
    }
}
