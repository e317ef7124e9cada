//! Streaming alert evaluation for coinwatch.
//!
//! For every decoded market event the [`RuleEvaluator`] consults a
//! per-product [`BaselineTracker`] and checks the configured rules:
//!
//! - large order: event size >= `min_size`
//! - price deviation: `price / baseline >= min_ratio`
//!
//! The first event seen for a product only seeds its baseline. Ticker and
//! book events keep separate baselines.

pub mod alert;
pub mod baseline;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod rule;

pub use alert::{AlertKind, AlertOccurrence};
pub use baseline::BaselineTracker;
pub use config::DetectorConfig;
pub use error::{DetectorError, DetectorResult};
pub use evaluator::{evaluate_with, RuleEvaluator};
pub use rule::Rule;
