//! Resplain Common Library
//!
//! Shared code for the Resplain API including:
//! - Database models, the storage abstraction, and its implementations
//! - Explanation generator abstraction
//! - Paper processing and gallery services
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod generation;
pub mod metrics;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{MemoryStore, Repository, Store};
pub use errors::{AppError, Result};
pub use generation::ExplanationGenerator;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
