//! t-digest quantile sketch
//!
//! Bounded-memory quantile accumulator with high accuracy at the extreme
//! percentiles (p01, p99) and full mergeability. Incoming observations are
//! buffered and folded into weighted centroids when the buffer fills; the
//! arcsin scale function keeps centroids small near the tails and large in
//! the middle of the distribution.
//!
//! # Thread Safety
//!
//! `TDigest` is `Send` but **not `Sync`**: queries on `&self` lazily fold
//! the buffer through a `RefCell` instead of cloning the sketch. For
//! concurrent read access, wrap in `Arc<Mutex<_>>`.

use crate::traits::{Accumulator, MergeError, QuantileEstimator};
use std::cell::RefCell;
use std::f64::consts::PI;

/// A weighted cluster of nearby observations
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Centroid {
    /// Mean of the clustered observations
    pub mean: f64,
    /// Number of observations in the cluster
    pub weight: u64,
}

impl Centroid {
    /// Create a centroid
    pub fn new(mean: f64, weight: u64) -> Self {
        Self { mean, weight }
    }

    /// Fold another cluster into this one, keeping the weighted mean
    fn absorb(&mut self, mean: f64, weight: u64) {
        let total = self.weight + weight;
        self.mean = (self.mean * self.weight as f64 + mean * weight as f64) / total as f64;
        self.weight = total;
    }
}

/// Interior state: folded centroids plus the unfolded insert buffer.
///
/// Kept behind a `RefCell` so `&self` queries can fold pending
/// observations in place.
#[derive(Clone, Debug)]
struct Clusters {
    /// Folded centroids, sorted by mean
    folded: Vec<Centroid>,
    /// Observations not yet folded
    pending: Vec<f64>,
}

/// Mergeable streaming quantile sketch
///
/// The `compression` parameter trades memory for accuracy: the sketch
/// keeps on the order of `compression` centroids. Typical values are
/// 100–500; the default is 100.
///
/// # Example
///
/// ```
/// use statkit::quantiles::TDigest;
/// use statkit::traits::QuantileEstimator;
///
/// let mut digest = TDigest::new(100.0);
///
/// for i in 1..=1000 {
///     digest.add(i as f64);
/// }
///
/// let p50 = digest.quantile(0.5).unwrap();
/// let p99 = digest.quantile(0.99).unwrap();
/// assert!(p50 > 450.0 && p50 < 550.0);
/// assert!(p99 > 950.0);
/// ```
#[derive(Debug)]
pub struct TDigest {
    compression: f64,
    /// Pending observations folded once this many accumulate
    buffer_limit: usize,
    clusters: RefCell<Clusters>,
    count: u64,
    min: f64,
    max: f64,
}

impl Clone for TDigest {
    fn clone(&self) -> Self {
        Self {
            compression: self.compression,
            buffer_limit: self.buffer_limit,
            clusters: RefCell::new(self.clusters.borrow().clone()),
            count: self.count,
            min: self.min,
            max: self.max,
        }
    }
}

impl Default for TDigest {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl TDigest {
    /// Create a sketch with the given compression parameter
    ///
    /// # Panics
    ///
    /// Panics if `compression` is not finite and positive.
    pub fn new(compression: f64) -> Self {
        assert!(
            compression.is_finite() && compression > 0.0,
            "compression must be finite and positive, got {}",
            compression
        );

        let buffer_limit = (compression * 2.0) as usize;
        Self {
            compression,
            buffer_limit,
            clusters: RefCell::new(Clusters {
                folded: Vec::with_capacity(compression as usize),
                pending: Vec::with_capacity(buffer_limit),
            }),
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Get the compression parameter
    pub fn compression(&self) -> f64 {
        self.compression
    }

    /// Get the number of folded centroids
    ///
    /// Does not include buffered observations; call
    /// [`compress`](Self::compress) first for the settled count.
    pub fn num_centroids(&self) -> usize {
        self.clusters.borrow().folded.len()
    }

    /// Register an observation
    ///
    /// NaN observations are ignored.
    pub fn add(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }

        // get_mut() bypasses RefCell runtime checks — we have &mut self
        let clusters = self.clusters.get_mut();
        clusters.pending.push(value);
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);

        if clusters.pending.len() >= self.buffer_limit {
            Self::fold(clusters, self.compression);
        }
    }

    /// Fold any buffered observations into centroids now
    pub fn compress(&mut self) {
        Self::fold(self.clusters.get_mut(), self.compression);
    }

    /// Fold the pending buffer into the centroid list
    fn fold(clusters: &mut Clusters, compression: f64) {
        if clusters.pending.is_empty() {
            return;
        }

        clusters.pending.sort_by(|a, b| a.total_cmp(b));

        let mut combined: Vec<Centroid> = clusters
            .pending
            .drain(..)
            .map(|v| Centroid::new(v, 1))
            .collect();

        if !clusters.folded.is_empty() {
            combined.append(&mut clusters.folded);
            combined.sort_by(|a, b| a.mean.total_cmp(&b.mean));
        }

        clusters.folded = Self::shrink(combined, compression);
    }

    /// Collapse a sorted centroid list to the size the scale function allows
    fn shrink(sorted: Vec<Centroid>, compression: f64) -> Vec<Centroid> {
        let total: u64 = sorted.iter().map(|c| c.weight).sum();
        let mut shrunk = Vec::with_capacity((compression * 2.0) as usize);

        let mut iter = sorted.into_iter();
        let mut current = match iter.next() {
            Some(first) => first,
            None => return shrunk,
        };
        let mut weight_before = 0u64;

        for candidate in iter {
            let widened = current.weight + candidate.weight;
            let q_lo = weight_before as f64 / total as f64;
            let q_hi = (weight_before + widened) as f64 / total as f64;

            // The candidate may join the current cluster only if the result
            // still spans less than one unit of the scale function
            if Self::scale(q_hi, compression) - Self::scale(q_lo, compression) <= 1.0 {
                current.absorb(candidate.mean, candidate.weight);
            } else {
                weight_before += current.weight;
                shrunk.push(current);
                current = candidate;
            }
        }

        shrunk.push(current);
        shrunk
    }

    /// Arcsin-family scale function; clamps against floating-point drift
    #[inline]
    fn scale(q: f64, compression: f64) -> f64 {
        let x = (2.0 * q - 1.0).clamp(-1.0, 1.0);
        compression * (x.asin() / PI + 0.5)
    }

    /// Fold pending observations from a `&self` query path
    fn settle(&self) {
        if self.clusters.borrow().pending.is_empty() {
            return;
        }
        Self::fold(&mut self.clusters.borrow_mut(), self.compression);
    }

    /// Value at cumulative probability `q` over the folded centroids.
    ///
    /// The distribution is modeled piecewise linearly through each
    /// centroid's midpoint rank, anchored at (0, min) and (count, max).
    fn value_at(folded: &[Centroid], count: u64, min: f64, max: f64, q: f64) -> Option<f64> {
        if count == 0 {
            return None;
        }

        let q = q.clamp(0.0, 1.0);

        if folded.is_empty() {
            return Some(min + (max - min) * q);
        }
        if q <= 0.0 {
            return Some(min);
        }
        if q >= 1.0 {
            return Some(max);
        }

        let target = q * count as f64;

        let mut anchor_rank = 0.0_f64;
        let mut anchor_value = min;
        let mut seen = 0.0_f64;

        for centroid in folded {
            let mid = seen + centroid.weight as f64 / 2.0;

            if target < mid {
                let span = mid - anchor_rank;
                if span <= 0.0 {
                    return Some(anchor_value);
                }
                let t = (target - anchor_rank) / span;
                return Some(anchor_value + t * (centroid.mean - anchor_value));
            }

            seen += centroid.weight as f64;
            anchor_rank = mid;
            anchor_value = centroid.mean;
        }

        // Past the last midpoint: close the curve at (count, max)
        let span = count as f64 - anchor_rank;
        if span <= 0.0 {
            return Some(max);
        }
        let t = (target - anchor_rank) / span;
        Some(anchor_value + t * (max - anchor_value))
    }

    /// Cumulative probability of `value`: the inverse of [`Self::value_at`]
    /// over the same piecewise-linear model.
    fn rank_of(folded: &[Centroid], count: u64, min: f64, max: f64, value: f64) -> f64 {
        if count == 0 {
            return 0.0;
        }

        // >= max checked first so a point-mass digest (min == max) reports
        // P(X ≤ max) = 1
        if value >= max {
            return 1.0;
        }
        if value <= min {
            return 0.0;
        }

        if folded.is_empty() {
            let span = max - min;
            if span <= 0.0 {
                return 0.5;
            }
            return (value - min) / span;
        }

        let mut anchor_rank = 0.0_f64;
        let mut anchor_value = min;
        let mut seen = 0.0_f64;

        for centroid in folded {
            let mid = seen + centroid.weight as f64 / 2.0;

            if value < centroid.mean {
                let span = centroid.mean - anchor_value;
                if span <= 0.0 {
                    return anchor_rank / count as f64;
                }
                let t = (value - anchor_value) / span;
                return (anchor_rank + t * (mid - anchor_rank)) / count as f64;
            }

            seen += centroid.weight as f64;
            anchor_rank = mid;
            anchor_value = centroid.mean;
        }

        let span = max - anchor_value;
        if span <= 0.0 {
            return 1.0;
        }
        let t = (value - anchor_value) / span;
        (anchor_rank + t * (count as f64 - anchor_rank)) / count as f64
    }
}

impl Accumulator for TDigest {
    type Observation = f64;

    fn register(&mut self, observation: &f64) {
        self.add(*observation);
    }

    fn merge(&mut self, other: &Self) -> Result<(), MergeError> {
        // Compression values are integer-ish; a small relative tolerance
        // absorbs serialization drift while still rejecting real mismatches
        let mid = (self.compression + other.compression) * 0.5;
        if mid > 0.0 && (self.compression - other.compression).abs() / mid > 1e-6 {
            return Err(MergeError::IncompatibleConfig {
                expected: format!("compression={}", self.compression),
                found: format!("compression={}", other.compression),
            });
        }

        let clusters = self.clusters.get_mut();
        let other_clusters = other.clusters.borrow();

        let mut combined = std::mem::take(&mut clusters.folded);
        combined.extend(other_clusters.folded.iter().cloned());
        combined.extend(clusters.pending.drain(..).map(|v| Centroid::new(v, 1)));
        combined.extend(other_clusters.pending.iter().map(|&v| Centroid::new(v, 1)));

        combined.sort_by(|a, b| a.mean.total_cmp(&b.mean));

        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        clusters.folded = Self::shrink(combined, self.compression);

        Ok(())
    }

    fn reset(&mut self) {
        let clusters = self.clusters.get_mut();
        clusters.folded.clear();
        clusters.pending.clear();
        self.count = 0;
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
    }

    fn count(&self) -> u64 {
        self.count
    }
}

impl QuantileEstimator for TDigest {
    fn quantile(&self, p: f64) -> Option<f64> {
        self.settle();
        let clusters = self.clusters.borrow();
        Self::value_at(&clusters.folded, self.count, self.min, self.max, p)
    }

    fn cumulative_probability(&self, value: f64) -> f64 {
        if value.is_nan() {
            return f64::NAN;
        }
        self.settle();
        let clusters = self.clusters.borrow();
        Self::rank_of(&clusters.folded, self.count, self.min, self.max, value)
    }

    fn min(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.min)
        }
    }

    fn max(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.max)
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TDigest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let clusters = self.clusters.borrow();
        let mut state = serializer.serialize_struct("TDigest", 6)?;
        state.serialize_field("compression", &self.compression)?;
        state.serialize_field("centroids", &clusters.folded)?;
        state.serialize_field("pending", &clusters.pending)?;
        state.serialize_field("count", &self.count)?;
        state.serialize_field("min", &self.min)?;
        state.serialize_field("max", &self.max)?;
        state.end()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Basic functionality ----

    #[test]
    fn test_basic() {
        let mut digest = TDigest::new(100.0);
        for i in 1..=100 {
            digest.add(i as f64);
        }
        let median = digest.median().unwrap();
        assert!(median > 45.0 && median < 55.0, "median={}", median);
    }

    #[test]
    fn test_empty() {
        let digest = TDigest::new(100.0);
        assert!(digest.is_empty());
        assert!(digest.median().is_none());
        assert!(digest.min().is_none());
        assert!(digest.max().is_none());
    }

    #[test]
    fn test_single_value() {
        let mut digest = TDigest::new(100.0);
        digest.add(42.0);
        for p in [0.0, 0.5, 1.0] {
            assert_eq!(digest.quantile(p), Some(42.0));
        }
    }

    #[test]
    fn test_quantile_accuracy() {
        let mut digest = TDigest::new(100.0);
        for i in 1..=1000 {
            digest.add(i as f64);
        }

        let p10 = digest.quantile(0.1).unwrap();
        let p50 = digest.quantile(0.5).unwrap();
        let p90 = digest.quantile(0.9).unwrap();
        let p99 = digest.quantile(0.99).unwrap();
        assert!(p10 > 50.0 && p10 < 150.0, "p10={}", p10);
        assert!(p50 > 450.0 && p50 < 550.0, "p50={}", p50);
        assert!(p90 > 850.0 && p90 < 950.0, "p90={}", p90);
        assert!(p99 > 950.0 && p99 <= 1000.0, "p99={}", p99);
    }

    #[test]
    fn test_extremes_are_exact() {
        let mut digest = TDigest::new(100.0);
        for i in 1..=1000 {
            digest.add(i as f64);
        }
        assert_eq!(digest.quantile(0.0), Some(1.0));
        assert_eq!(digest.quantile(1.0), Some(1000.0));
    }

    // ---- Merge ----

    #[test]
    fn test_merge() {
        let mut left = TDigest::new(100.0);
        let mut right = TDigest::new(100.0);
        for i in 1..=500 {
            left.add(i as f64);
        }
        for i in 501..=1000 {
            right.add(i as f64);
        }

        left.merge(&right).unwrap();

        assert_eq!(left.count(), 1000);
        assert_eq!(left.min(), Some(1.0));
        assert_eq!(left.max(), Some(1000.0));
        let median = left.median().unwrap();
        assert!(median > 450.0 && median < 550.0, "median={}", median);
    }

    #[test]
    fn test_merge_incompatible_compression() {
        let mut left = TDigest::new(100.0);
        left.add(1.0);
        let right = TDigest::new(200.0);
        assert!(left.merge(&right).is_err());
    }

    #[test]
    fn test_merge_tolerates_float_drift() {
        let mut left = TDigest::new(100.0);
        left.add(1.0);
        let right = TDigest::new(100.0 + 1e-12);
        assert!(left.merge(&right).is_ok());
    }

    // ---- Parameter validation ----

    #[test]
    #[should_panic(expected = "compression must be finite and positive")]
    fn test_zero_compression_panics() {
        TDigest::new(0.0);
    }

    #[test]
    #[should_panic(expected = "compression must be finite and positive")]
    fn test_negative_compression_panics() {
        TDigest::new(-5.0);
    }

    #[test]
    #[should_panic(expected = "compression must be finite and positive")]
    fn test_nan_compression_panics() {
        TDigest::new(f64::NAN);
    }

    // ---- NaN / infinity ----

    #[test]
    fn test_nan_ignored() {
        let mut digest = TDigest::new(100.0);
        digest.add(1.0);
        digest.add(f64::NAN);
        digest.add(3.0);
        assert_eq!(digest.count(), 2);
        assert!(!digest.median().unwrap().is_nan());
    }

    #[test]
    fn test_infinity() {
        let mut digest = TDigest::new(100.0);
        digest.add(1.0);
        digest.add(f64::INFINITY);
        assert_eq!(digest.max(), Some(f64::INFINITY));
    }

    // ---- Memory bound ----

    #[test]
    fn test_centroid_count_bounded() {
        let mut digest = TDigest::new(100.0);
        for i in 0..100_000 {
            digest.add((i % 1000) as f64);
        }
        digest.compress();
        // The scale function admits roughly `compression` centroids
        assert!(
            digest.num_centroids() <= 200,
            "centroids={}",
            digest.num_centroids()
        );
    }

    // ---- Lazy fold on &self queries ----

    #[test]
    fn test_query_does_not_require_mut() {
        let mut digest = TDigest::new(100.0);
        for i in 1..=10 {
            digest.add(i as f64);
        }

        let shared: &TDigest = &digest;
        assert!(shared.quantile(0.5).is_some());
        assert!(shared.cumulative_probability(5.0) > 0.0);
    }

    #[test]
    fn test_query_settles_buffer() {
        let mut digest = TDigest::new(100.0);
        for i in 1..=10 {
            digest.add(i as f64);
        }
        assert!(!digest.clusters.borrow().pending.is_empty());
        digest.quantile(0.5);
        assert!(digest.clusters.borrow().pending.is_empty());
    }

    // ---- Monotonicity and consistency ----

    #[test]
    fn test_quantile_monotonic() {
        let mut digest = TDigest::new(100.0);
        for i in 1..=10_000 {
            digest.add(i as f64);
        }

        let mut prev = f64::NEG_INFINITY;
        for i in 0..=100 {
            let q = i as f64 / 100.0;
            let v = digest.quantile(q).unwrap();
            assert!(v >= prev, "q({})={} < previous {}", q, v, prev);
            assert!(!v.is_nan());
            prev = v;
        }
    }

    #[test]
    fn test_rank_monotonic() {
        let mut digest = TDigest::new(100.0);
        for i in 1..=10_000 {
            digest.add(i as f64);
        }

        let mut prev = -1.0_f64;
        for i in 0..=100 {
            let v = i as f64 * 100.0;
            let r = digest.cumulative_probability(v);
            assert!(r >= prev, "rank({})={} < previous {}", v, r, prev);
            assert!(!r.is_nan());
            prev = r;
        }
    }

    #[test]
    fn test_rank_quantile_consistency() {
        let mut digest = TDigest::new(200.0);
        for i in 1..=10_000 {
            digest.add(i as f64);
        }

        for i in 1..=99 {
            let p = i as f64 / 100.0;
            let v = digest.quantile(p).unwrap();
            let back = digest.cumulative_probability(v);
            assert!(
                (back - p).abs() < 0.05,
                "p={}, quantile={}, rank(quantile)={}",
                p,
                v,
                back
            );
        }
    }

    // ---- Degenerate distributions ----

    #[test]
    fn test_point_mass() {
        let mut digest = TDigest::new(100.0);
        for _ in 0..1000 {
            digest.add(42.0);
        }

        for i in 0..=10 {
            assert_eq!(digest.quantile(i as f64 / 10.0), Some(42.0));
        }
        assert_eq!(digest.cumulative_probability(42.0), 1.0);
        assert_eq!(digest.cumulative_probability(41.0), 0.0);
    }

    #[test]
    fn test_two_point_distribution() {
        let mut digest = TDigest::new(100.0);
        for _ in 0..5000 {
            digest.add(0.0);
        }
        for _ in 0..5000 {
            digest.add(100.0);
        }

        assert_eq!(digest.cumulative_probability(0.0), 0.0);
        assert_eq!(digest.cumulative_probability(100.0), 1.0);
        let mid = digest.cumulative_probability(50.0);
        assert!(mid > 0.3 && mid < 0.7, "rank(50)={}", mid);

        let mut prev = f64::NEG_INFINITY;
        for i in 0..=20 {
            let v = digest.quantile(i as f64 / 20.0).unwrap();
            assert!(v >= prev && !v.is_nan());
            prev = v;
        }
    }

    #[test]
    fn test_tight_cluster_no_nan() {
        let mut digest = TDigest::new(100.0);
        let base = 1e15;
        for i in 0..1000 {
            digest.add(base + i as f64 * 1e-10);
        }

        for i in 0..=10 {
            assert!(!digest.quantile(i as f64 / 10.0).unwrap().is_nan());
        }
        assert!(!digest.cumulative_probability(base).is_nan());
    }

    #[test]
    fn test_reset() {
        let mut digest = TDigest::new(100.0);
        for i in 1..=100 {
            digest.add(i as f64);
        }
        digest.reset();
        assert!(digest.is_empty());
        assert!(digest.median().is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialize() {
        let mut digest = TDigest::new(100.0);
        for i in 1..=500 {
            digest.add(i as f64);
        }
        digest.compress();

        let json = serde_json::to_value(&digest).unwrap();
        assert_eq!(json["compression"], 100.0);
        assert_eq!(json["count"], 500);
        assert_eq!(json["min"], 1.0);
        assert!(json["centroids"].as_array().unwrap().len() > 1);
    }
}
