//! Time-persistent statistics
//!
//! Weights each value by the span of time during which it was the current
//! value, built on top of [`WeightedTally`].

use crate::statistics::WeightedTally;

/// Time-weighted tally over a piecewise-constant signal
///
/// Each registered value stays "current" until the next registration (or
/// [`end`](Self::end)); the span it persisted becomes its weight in an
/// inner [`WeightedTally`]. The result is the time-weighted mean, variance,
/// min, and max of the signal.
///
/// # Example
///
/// ```
/// use statkit::statistics::TimestampWeightedTally;
///
/// let mut tally = TimestampWeightedTally::new();
///
/// tally.register(0.0, 2.0);  // value 2 from t=0
/// tally.register(1.0, 6.0);  // value 6 from t=1
/// tally.register(4.0, 0.0);  // value 0 from t=4
/// tally.end(5.0);
///
/// // 2 for 1s, 6 for 3s, 0 for 1s → mean = (2 + 18 + 0) / 5 = 4.0
/// assert!((tally.weighted_mean() - 4.0).abs() < 1e-12);
/// assert!(!tally.is_active());
/// ```
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimestampWeightedTally {
    /// Accumulates (value, duration) pairs for closed intervals
    tally: WeightedTally,
    /// Timestamp of the first registration
    start_time: f64,
    /// Timestamp of the most recent registration
    current_time: f64,
    /// Value current since `current_time`
    current_value: f64,
    /// Whether any value has been registered yet
    initialized: bool,
    /// False once `end` has been called
    active: bool,
}

impl Default for TimestampWeightedTally {
    fn default() -> Self {
        Self::new()
    }
}

impl TimestampWeightedTally {
    /// Create a new active time-weighted tally
    pub fn new() -> Self {
        Self {
            tally: WeightedTally::new(),
            start_time: 0.0,
            current_time: 0.0,
            current_value: 0.0,
            initialized: false,
            active: true,
        }
    }

    /// Register that `value` became current at `timestamp`
    ///
    /// Closes the previous value's interval, weighting it by the elapsed
    /// time. An interval of zero width contributes nothing; the new value
    /// still replaces the current one.
    ///
    /// # Panics
    ///
    /// Panics if the tally has been ended, if `timestamp` is not finite or
    /// moves backwards, or if `value` is NaN (a NaN that persists would
    /// poison every later interval).
    pub fn register(&mut self, timestamp: f64, value: f64) {
        assert!(self.active, "cannot register on an ended tally");
        assert!(
            timestamp.is_finite(),
            "timestamp must be finite, got {}",
            timestamp
        );
        assert!(!value.is_nan(), "value must not be NaN");

        if self.initialized {
            assert!(
                timestamp >= self.current_time,
                "timestamps must be non-decreasing: {} < {}",
                timestamp,
                self.current_time
            );
            self.tally.add(self.current_value, timestamp - self.current_time);
        } else {
            self.start_time = timestamp;
            self.initialized = true;
        }

        self.current_time = timestamp;
        self.current_value = value;
    }

    /// Close the final interval at `timestamp` and deactivate the tally
    ///
    /// # Panics
    ///
    /// Panics if the tally has already been ended, or if `timestamp` is not
    /// finite or lies before the last registration.
    pub fn end(&mut self, timestamp: f64) {
        assert!(self.active, "tally has already been ended");
        assert!(
            timestamp.is_finite(),
            "timestamp must be finite, got {}",
            timestamp
        );

        if self.initialized {
            assert!(
                timestamp >= self.current_time,
                "timestamps must be non-decreasing: {} < {}",
                timestamp,
                self.current_time
            );
            self.tally.add(self.current_value, timestamp - self.current_time);
            self.current_time = timestamp;
        }

        self.active = false;
    }

    /// Check whether the tally still accepts registrations
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Get the value current since the last registration
    ///
    /// `None` before the first registration.
    pub fn last_value(&self) -> Option<f64> {
        if self.initialized {
            Some(self.current_value)
        } else {
            None
        }
    }

    /// Get the total observed time span (sum of closed interval widths)
    pub fn elapsed(&self) -> f64 {
        self.tally.weight_sum()
    }

    /// Get the number of closed, positive-width intervals
    pub fn len(&self) -> u64 {
        self.tally.len()
    }

    /// Check if no interval has been closed yet
    pub fn is_empty(&self) -> bool {
        self.tally.is_empty()
    }

    /// Get the time-weighted mean of the signal
    pub fn weighted_mean(&self) -> f64 {
        self.tally.weighted_mean()
    }

    /// Get the time-weighted population variance
    pub fn weighted_variance(&self) -> f64 {
        self.tally.weighted_variance()
    }

    /// Get the time-weighted sample variance
    pub fn weighted_sample_variance(&self) -> f64 {
        self.tally.weighted_sample_variance()
    }

    /// Get the time-weighted population standard deviation
    pub fn weighted_stddev(&self) -> f64 {
        self.tally.weighted_stddev()
    }

    /// Get the time-weighted sample standard deviation
    pub fn weighted_sample_stddev(&self) -> f64 {
        self.tally.weighted_sample_stddev()
    }

    /// Get the time integral of the signal (Σ valueᵢ·durationᵢ)
    pub fn weighted_sum(&self) -> f64 {
        self.tally.weighted_sum()
    }

    /// Get the minimum value over closed intervals
    pub fn min(&self) -> Option<f64> {
        self.tally.min()
    }

    /// Get the maximum value over closed intervals
    pub fn max(&self) -> Option<f64> {
        self.tally.max()
    }

    /// Reset to a fresh, active tally
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        let mut tally = TimestampWeightedTally::new();

        tally.register(0.0, 2.0);
        tally.register(1.0, 6.0);
        tally.register(4.0, 0.0);
        tally.end(5.0);

        assert_eq!(tally.len(), 3);
        assert_eq!(tally.elapsed(), 5.0);
        assert!((tally.weighted_mean() - 4.0).abs() < 1e-12);
        assert!((tally.weighted_sum() - 20.0).abs() < 1e-12);
        assert_eq!(tally.min(), Some(0.0));
        assert_eq!(tally.max(), Some(6.0));
        assert!(!tally.is_active());
    }

    #[test]
    fn test_variance() {
        let mut tally = TimestampWeightedTally::new();

        // 10 for 2s, 4 for 2s → mean 7, variance (2·9 + 2·9)/4 = 9
        tally.register(0.0, 10.0);
        tally.register(2.0, 4.0);
        tally.end(4.0);

        assert!((tally.weighted_mean() - 7.0).abs() < 1e-12);
        assert!((tally.weighted_variance() - 9.0).abs() < 1e-12);
        assert!((tally.weighted_stddev() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_first_registration_only_arms() {
        let mut tally = TimestampWeightedTally::new();

        tally.register(10.0, 5.0);

        // No interval closed yet
        assert!(tally.is_empty());
        assert_eq!(tally.last_value(), Some(5.0));
        assert_eq!(tally.elapsed(), 0.0);
    }

    #[test]
    fn test_equal_timestamps_replace_value() {
        let mut tally = TimestampWeightedTally::new();

        tally.register(0.0, 1.0);
        tally.register(1.0, 2.0);
        // Zero-width interval: value 2 never persisted
        tally.register(1.0, 3.0);
        tally.end(2.0);

        // 1 for 1s, 3 for 1s
        assert_eq!(tally.len(), 2);
        assert!((tally.weighted_mean() - 2.0).abs() < 1e-12);
        assert_eq!(tally.max(), Some(3.0));
    }

    #[test]
    fn test_end_without_registrations() {
        let mut tally = TimestampWeightedTally::new();
        tally.end(1.0);

        assert!(!tally.is_active());
        assert!(tally.is_empty());
        assert_eq!(tally.last_value(), None);
    }

    #[test]
    #[should_panic(expected = "timestamps must be non-decreasing")]
    fn test_backwards_timestamp_panics() {
        let mut tally = TimestampWeightedTally::new();
        tally.register(5.0, 1.0);
        tally.register(4.0, 2.0);
    }

    #[test]
    #[should_panic(expected = "cannot register on an ended tally")]
    fn test_register_after_end_panics() {
        let mut tally = TimestampWeightedTally::new();
        tally.register(0.0, 1.0);
        tally.end(1.0);
        tally.register(2.0, 2.0);
    }

    #[test]
    #[should_panic(expected = "tally has already been ended")]
    fn test_double_end_panics() {
        let mut tally = TimestampWeightedTally::new();
        tally.end(1.0);
        tally.end(2.0);
    }

    #[test]
    #[should_panic(expected = "value must not be NaN")]
    fn test_nan_value_panics() {
        let mut tally = TimestampWeightedTally::new();
        tally.register(0.0, f64::NAN);
    }

    #[test]
    #[should_panic(expected = "timestamp must be finite")]
    fn test_infinite_timestamp_panics() {
        let mut tally = TimestampWeightedTally::new();
        tally.register(f64::INFINITY, 1.0);
    }

    #[test]
    fn test_reset_reactivates() {
        let mut tally = TimestampWeightedTally::new();
        tally.register(0.0, 1.0);
        tally.end(1.0);

        tally.reset();

        assert!(tally.is_active());
        assert!(tally.is_empty());
        assert_eq!(tally.last_value(), None);
        tally.register(0.0, 9.0);
        tally.end(2.0);
        assert!((tally.weighted_mean() - 9.0).abs() < 1e-12);
    }
}
