//! OneSecure Common - Shared types and utilities
//!
//! This crate provides the domain model, configuration, and error types
//! shared across all OneSecure components.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
