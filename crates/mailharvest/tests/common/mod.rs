//! Shared test utilities for mailharvest integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs against a temp storage directory
//! - Builders for messages and configs

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{AckCounter, TestHarness};
