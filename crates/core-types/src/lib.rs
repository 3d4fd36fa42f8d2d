//! # Event Study Core Types
//!
//! Layer 0 of the workspace: the plain data structures every other crate
//! speaks in. Nothing here performs statistics; constructors only enforce
//! the ordering and positivity invariants the pipeline relies on.

pub mod error;
pub mod series;
pub mod windows;

// Re-export the core types to provide a clean public API.
pub use error::CoreError;
pub use series::{DatedValue, PricePoint, PriceSeries, ReturnSeries};
pub use windows::{
    DifferenceVariance, EstimationWindowSpec, EventWindowSpec, VarianceConvention, WindowKind,
};
