//! Exact quantiles over stored observations
//!
//! Stores every observation and answers quantile queries exactly. The
//! backing vector is sorted lazily on the first query after a mutation,
//! through interior mutability, so read-heavy workloads sort once.
//!
//! # Thread Safety
//!
//! `FullStorage` is `Send` but **not `Sync`** due to the internal
//! `RefCell`. For concurrent read access, wrap in `Arc<Mutex<_>>`.

use crate::traits::{Accumulator, MergeError, QuantileEstimator};
use std::cell::RefCell;

#[derive(Clone, Debug)]
struct Store {
    values: Vec<f64>,
    sorted: bool,
}

/// Exact quantile accumulator
///
/// Memory grows linearly with the number of observations; queries are
/// exact. Quantiles interpolate linearly between order statistics (the
/// R-7 definition); cumulative probabilities use the mid-distribution
/// convention, which stays unbiased on heavily tied data.
///
/// # Example
///
/// ```
/// use statkit::quantiles::FullStorage;
/// use statkit::traits::QuantileEstimator;
///
/// let mut exact = FullStorage::new();
/// for i in 1..=100 {
///     exact.add(i as f64);
/// }
///
/// assert_eq!(exact.quantile(0.0), Some(1.0));
/// assert_eq!(exact.quantile(1.0), Some(100.0));
/// assert_eq!(exact.median(), Some(50.5));
/// ```
#[derive(Clone, Debug)]
pub struct FullStorage {
    store: RefCell<Store>,
}

impl Default for FullStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl FullStorage {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self {
            store: RefCell::new(Store {
                values: Vec::new(),
                sorted: true,
            }),
        }
    }

    /// Create an empty accumulator with room for `capacity` observations
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            store: RefCell::new(Store {
                values: Vec::with_capacity(capacity),
                sorted: true,
            }),
        }
    }

    /// Register an observation
    ///
    /// NaN observations are ignored.
    pub fn add(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        // get_mut() bypasses RefCell runtime checks — we have &mut self
        let store = self.store.get_mut();
        store.values.push(value);
        store.sorted = false;
    }

    /// Get the number of stored observations
    pub fn len(&self) -> usize {
        self.store.borrow().values.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sort the backing store now (queries on `&self` do this lazily)
    pub fn sort(&mut self) {
        Self::sort_store(self.store.get_mut());
    }

    fn sort_store(store: &mut Store) {
        if !store.sorted {
            store.values.sort_by(|a, b| a.total_cmp(b));
            store.sorted = true;
        }
    }

    /// Ensure the store is sorted, for `&self` query methods
    fn ensure_sorted(&self) {
        if self.store.borrow().sorted {
            return;
        }
        Self::sort_store(&mut self.store.borrow_mut());
    }
}

impl Accumulator for FullStorage {
    type Observation = f64;

    fn register(&mut self, observation: &f64) {
        self.add(*observation);
    }

    fn merge(&mut self, other: &Self) -> Result<(), MergeError> {
        let other_store = other.store.borrow();
        if other_store.values.is_empty() {
            return Ok(());
        }
        let store = self.store.get_mut();
        store.values.extend_from_slice(&other_store.values);
        store.sorted = false;
        Ok(())
    }

    fn reset(&mut self) {
        let store = self.store.get_mut();
        store.values.clear();
        store.sorted = true;
    }

    fn count(&self) -> u64 {
        self.len() as u64
    }
}

impl QuantileEstimator for FullStorage {
    fn quantile(&self, p: f64) -> Option<f64> {
        self.ensure_sorted();
        let store = self.store.borrow();
        let values = &store.values;
        let n = values.len();
        if n == 0 {
            return None;
        }

        let p = p.clamp(0.0, 1.0);

        // R-7: h = (n-1)·p, interpolate between the straddling order statistics
        let h = (n - 1) as f64 * p;
        let lo = h.floor() as usize;
        let frac = h - lo as f64;

        if lo + 1 < n && frac > 0.0 {
            Some(values[lo] + frac * (values[lo + 1] - values[lo]))
        } else {
            Some(values[lo.min(n - 1)])
        }
    }

    fn cumulative_probability(&self, value: f64) -> f64 {
        if value.is_nan() {
            return f64::NAN;
        }
        self.ensure_sorted();
        let store = self.store.borrow();
        let values = &store.values;
        let n = values.len();
        if n == 0 {
            return 0.0;
        }

        // Mid-distribution CDF: (count_less + count_equal/2) / n
        let less = values.partition_point(|&x| x < value);
        let less_or_equal = values.partition_point(|&x| x <= value);
        let equal = less_or_equal - less;

        (less as f64 + equal as f64 / 2.0) / n as f64
    }

    fn min(&self) -> Option<f64> {
        self.ensure_sorted();
        self.store.borrow().values.first().copied()
    }

    fn max(&self) -> Option<f64> {
        self.ensure_sorted();
        self.store.borrow().values.last().copied()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for FullStorage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let store = self.store.borrow();
        let mut state = serializer.serialize_struct("FullStorage", 1)?;
        state.serialize_field("values", &store.values)?;
        state.end()
    }
}
