//! Quantile accumulator strategies
//!
//! This module provides interchangeable implementations of the
//! [`QuantileEstimator`](crate::traits::QuantileEstimator) trait:
//!
//! - [`FullStorage`]: exact quantiles, stores every observation
//! - [`NormalApprox`]: O(1) memory, assumes normally distributed data
//! - [`TDigest`]: bounded-memory mergeable sketch, accurate at the tails
//!
//! # Example
//!
//! ```
//! use statkit::quantiles::FullStorage;
//! use statkit::traits::QuantileEstimator;
//!
//! let mut exact = FullStorage::new();
//!
//! for value in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0] {
//!     exact.add(value);
//! }
//!
//! assert_eq!(exact.median(), Some(5.5));
//! ```

mod full_storage;
mod normal;
mod tdigest;

pub use full_storage::FullStorage;
pub use normal::NormalApprox;
pub use tdigest::{Centroid, TDigest};
