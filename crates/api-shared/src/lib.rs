//! # API Shared
//!
//! Shared utilities and definitions for the Medical Records Bridge APIs.
//!
//! Contains:
//! - Request/response types (`dto` module) with OpenAPI schemas
//! - The liveness report (`health::check_health`)
//! - Authentication utilities
//!
//! Used by `api-rest` and the workspace runner for common functionality.

pub mod auth;
pub mod dto;
pub mod health;

pub use dto::*;
pub use health::check_health;
