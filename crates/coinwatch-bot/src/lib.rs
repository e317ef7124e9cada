//! coinwatch market-data alert service.
//!
//! Wires the components together:
//! - Feed connection and subscription (`coinwatch-ws`)
//! - Event decoding (`coinwatch-feed`)
//! - Baseline tracking and rule evaluation (`coinwatch-detector`)
//! - Message rendering and notification dispatch (`coinwatch-notify`)

pub mod app;
pub mod config;
pub mod error;

pub use app::{build_notifier, Application};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
