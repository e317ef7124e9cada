//! Shared helpers for coinwatch-bot integration tests.

pub mod common;
