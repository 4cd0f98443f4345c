//! Sticker Common - Shared types, utilities, and configuration for the sticker merge bot.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - Error types and handling utilities
//! - Logging setup and structured logging helpers
//! - Small string utilities shared by the core and the bot

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{Config, MergeConfig, ObservabilityConfig, TelegramConfig};
pub use error::{Error, Result};
pub use validation::{ValidationError, ValidationResult};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{Config, MergeConfig, TelegramConfig};
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::logging::init_logging;
    pub use crate::validation::ValidationError;
}
