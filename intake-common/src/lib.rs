//! # Intake Common Library
//!
//! Shared code for the intake extraction crates:
//! - Error and result types
//! - TOML configuration loading with layered resolution
//! - Tracing subscriber initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use config::IntakeConfig;
pub use error::{Error, Result};
