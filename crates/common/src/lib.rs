//! Common utilities for Questlog
//!
//! Shared code used across all Questlog crates.

pub mod error;

pub use error::{Error, Result};
