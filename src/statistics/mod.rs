//! Streaming statistics accumulators
//!
//! This module provides single-pass, constant-memory accumulators for
//! summarizing observation streams: plain, weighted, and time-weighted.
//!
//! # Accumulators
//!
//! - [`Tally`]: count, mean, variance, skewness, kurtosis of scalar observations
//! - [`WeightedTally`]: observations carrying a non-negative weight
//! - [`TimestampWeightedTally`]: values weighted by how long they persisted
//!
//! # Example
//!
//! ```
//! use statkit::statistics::Tally;
//!
//! let mut tally = Tally::new();
//!
//! for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
//!     tally.add(value);
//! }
//!
//! println!("Mean: {}", tally.mean());
//! println!("Stddev: {}", tally.stddev());
//! println!("Min: {:?}", tally.min());
//! println!("Max: {:?}", tally.max());
//! ```

mod tally;
mod timestamped;
mod weighted;

#[cfg(feature = "event")]
#[cfg_attr(docsrs, doc(cfg(feature = "event")))]
mod event_driven;

pub use tally::Tally;
pub use timestamped::TimestampWeightedTally;
pub use weighted::WeightedTally;

#[cfg(feature = "event")]
pub use event_driven::{EventTally, ListeningTally, INITIALIZED, OBSERVATION_ADDED};
