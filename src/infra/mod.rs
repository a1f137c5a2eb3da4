//! Infrastructure layer for cross-cutting concerns.
//!
//! Provides:
//! - Configuration file management and environment overrides
//! - Error handling and result types

pub mod config;
pub mod error;
