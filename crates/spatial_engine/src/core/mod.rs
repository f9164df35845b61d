//! # Core Engine Module
//!
//! Shared abstractions that the other subsystems depend on.
//!
//! ## Organization
//!
//! - **Config**: Unified configuration for the index, pools, and collision system

pub mod config;

// Re-export commonly used config types
pub use config::{
    SpatialConfig,
    PhysicsConfig,
};
pub use crate::config::{Config, ConfigError};
