//! Core shared library for QueryLens.
//!
//! This crate exposes the primitives every other QueryLens crate depends
//! on: the canonical error type, configuration loading from the
//! environment, logging setup and JSON helpers used to build stable
//! cache keys.

pub mod config;
pub mod errors;
pub mod logging;
pub mod serde_utils;

pub use config::{CoreConfig, Environment};
pub use errors::{ConfigError, QueryLensError, Result as CoreResult};
