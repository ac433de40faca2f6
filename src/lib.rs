//! # Statkit
//!
//! Mergeable streaming statistics and supporting utilities for Rust.
//!
//! Statkit provides single-pass, numerically careful accumulators for
//! summarizing observation streams, together with the utility families
//! that commonly surround them: quantile estimation, observer-style change
//! notification, and typed tabular data with CSV/XML round-trip.
//!
//! ## Features
//!
//! - **Statistics**: count, mean, variance, skewness, kurtosis with `Tally`;
//!   weighted and time-weighted variants
//! - **Quantiles**: exact, normal-approximation, and t-digest strategies
//!   behind one trait
//! - **Events**: lightweight producer/listener primitives for change
//!   notification
//! - **Tables**: typed columns, validated appends, lossless CSV/XML
//!   serialization
//! - **Full Mergeability**: accumulators support distributed merge
//!   operations
//!
//! ## Quick Start
//!
//! ```rust
//! use statkit::prelude::*;
//!
//! // Summarize a stream of observations
//! let mut tally = Tally::new();
//! for wait_time in [1.5, 0.9, 4.2, 2.8, 1.1] {
//!     tally.add(wait_time);
//! }
//! println!("mean wait: {:.2} ± {:.2}", tally.mean(), tally.sample_stddev());
//!
//! // Estimate percentiles without storing the stream
//! let mut digest = TDigest::new(100.0);
//! for i in 0..10_000 {
//!     digest.add((i % 500) as f64);
//! }
//! println!("p99: {:?}", digest.quantile(0.99));
//! ```
//!
//! ## Distributed Computing
//!
//! All accumulators implement the [`Accumulator`](traits::Accumulator)
//! trait, which includes a `merge` operation for combining partial results
//! across workers:
//!
//! ```rust
//! use statkit::statistics::Tally;
//! use statkit::traits::Accumulator;
//!
//! let mut worker1 = Tally::new();
//! let mut worker2 = Tally::new();
//!
//! // Each worker summarizes its partition
//! worker1.add(1.0);
//! worker2.add(3.0);
//!
//! // Combine the partial summaries
//! worker1.merge(&worker2).unwrap();
//! assert_eq!(worker1.len(), 2);
//! ```
//!
//! ## Feature Flags
//!
//! Utility families (pick what you need):
//! - `statistics` (default): `Tally`, `WeightedTally`, `TimestampWeightedTally`
//! - `quantiles` (default): `FullStorage`, `NormalApprox`, `TDigest`
//! - `event` (default): `EventProducer`, `EventListener` primitives
//! - `table` (default): typed tables with CSV/XML round-trip
//! - `full`: enable all utility families
//!
//! Platform features:
//! - `serde`: enable serialization

#![cfg_attr(docsrs, feature(doc_cfg))]

// Core traits and math always available
pub mod math;
pub mod traits;

#[cfg(feature = "statistics")]
#[cfg_attr(docsrs, doc(cfg(feature = "statistics")))]
pub mod statistics;

#[cfg(feature = "quantiles")]
#[cfg_attr(docsrs, doc(cfg(feature = "quantiles")))]
pub mod quantiles;

#[cfg(feature = "event")]
#[cfg_attr(docsrs, doc(cfg(feature = "event")))]
pub mod event;

#[cfg(feature = "table")]
#[cfg_attr(docsrs, doc(cfg(feature = "table")))]
pub mod table;

pub mod prelude {
    //! Convenience re-export of the main types and traits

    pub use crate::traits::*;

    #[cfg(feature = "statistics")]
    pub use crate::statistics::{Tally, TimestampWeightedTally, WeightedTally};

    #[cfg(feature = "quantiles")]
    pub use crate::quantiles::{FullStorage, NormalApprox, TDigest};

    #[cfg(feature = "event")]
    pub use crate::event::{Event, EventListener, EventProducer, EventType, Payload};

    #[cfg(feature = "table")]
    pub use crate::table::{Column, DataType, Record, Table, Value};
}

#[cfg(feature = "statistics")]
pub use statistics::{Tally, TimestampWeightedTally, WeightedTally};

#[cfg(feature = "quantiles")]
pub use quantiles::{FullStorage, NormalApprox, TDigest};

#[cfg(feature = "event")]
pub use event::{EventListener, EventProducer};

#[cfg(feature = "table")]
pub use table::Table;
