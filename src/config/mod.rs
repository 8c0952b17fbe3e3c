//! Configuration Module
//!
//! Ingestion and trend settings loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `CARELINK_CONFIG` environment variable (path to TOML file)
//! 2. `carelink.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded config is passed explicitly to each pipeline run; there is no
//! process-wide instance.

mod app_config;
pub mod validation;

pub use app_config::*;
