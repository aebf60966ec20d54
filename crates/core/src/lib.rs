//! Helpdesk Core Library
//!
//! This crate provides the foundational utilities shared by the helpdesk
//! retrieval assistant:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Application configuration

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
