//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and the frame of reference
//! - Fixed-slot object pools
//! - Logging utilities

pub mod math;
pub mod pool;
pub mod logging;
