//! Structured logging and Prometheus metrics for coinwatch.
//!
//! - `init_logging`: tracing subscriber, pretty for development, JSON for
//!   production
//! - `Metrics`: static counters for feed, decode, evaluation and
//!   notification activity, with a snapshot for periodic summaries

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LogFormat};
pub use metrics::{Metrics, MetricsSnapshot};
