//! # Event Study Analytics
//!
//! This crate measures whether a dated event moved one instrument's price
//! abnormally, and whether that move differs between two instruments, using
//! the market-model event-study method.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of where
//!   prices come from. It depends only on `core-types` (Layer 0).
//! - **Forward-only pipeline:** returns → aligned panel → estimation/event split
//!   → market model → abnormal returns → CAR → significance tests. Every stage
//!   returns a new immutable value; no stage reaches back into another.
//! - **Per-asset independence:** once the panel is split, each asset's model,
//!   abnormal returns and CAR depend only on its own column and the market
//!   column, so assets can be analysed concurrently. Pairwise tests are the
//!   only join point.
//!
//! ## Public API
//!
//! - `EventStudyEngine` / `StudyParameters`: orchestrate a full study.
//! - `simple_returns`, `ReturnPanel`, `split`, `MarketModel`,
//!   `AbnormalReturnSeries`, `CarSeries`, `SignificanceTester`: the individual stages.
//! - `EventStudyReport`: the serialisable result.
//! - `StudyError`: the specific error types that can be returned from this crate.

pub mod abnormal;
pub mod car;
pub mod engine;
pub mod error;
pub mod market_model;
pub mod panel;
pub mod report;
pub mod returns;
pub mod significance;
mod stats;
pub mod window;

// Re-export the key components to create a clean, public-facing API.
pub use abnormal::AbnormalReturnSeries;
pub use car::{CarSeries, CarSummary};
pub use engine::{EventStudyEngine, StudyParameters};
pub use error::StudyError;
pub use market_model::MarketModel;
pub use panel::ReturnPanel;
pub use report::{AssetResult, EventStudyReport, PairComparison};
pub use returns::simple_returns;
pub use significance::{SignificanceTester, TestResult, difference_test, single_series_test};
pub use stats::VARIANCE_EPSILON;
pub use window::{ResolvedWindow, SplitPanel, split};
