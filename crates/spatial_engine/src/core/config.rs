//! # Unified Configuration
//!
//! Collects the tunables of every subsystem into one serializable structure
//! that can be loaded from TOML or RON through the [`Config`] trait.
//!
//! ## Configuration Categories
//!
//! - **Octree**: occupancy bound, depth bound, world extent
//! - **Pool**: initial capacity and growth factor of every object pool
//! - **Physics**: narrow-phase tolerances and per-step maintenance

use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigError};
use crate::foundation::pool::PoolConfig;
use crate::physics::collider::hull::FURTHEST_POINT_TOLERANCE;
use crate::spatial::OctreeConfig;

/// # Physics Configuration
///
/// Settings for the collision system that sits on top of the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Band below the maximum projection within which hull points count as
    /// "furthest" (one `f32::EPSILON` is always added on top)
    pub furthest_point_tolerance: f32,

    /// Collapse empty subtrees after every step
    pub prune_each_step: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            furthest_point_tolerance: FURTHEST_POINT_TOLERANCE,
            prune_each_step: true,
        }
    }
}

/// # Complete Configuration
///
/// Top-level configuration that encompasses every subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Log filter used when the application initialises logging
    pub log_level: String,
    /// Octree index configuration
    pub octree: OctreeConfig,
    /// Object pool sizing
    pub pool: PoolConfig,
    /// Collision system configuration
    pub physics: PhysicsConfig,
}

impl SpatialConfig {
    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set octree configuration
    pub fn with_octree(mut self, octree: OctreeConfig) -> Self {
        self.octree = octree;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.octree.max_occupancy == 0 {
            return Err(ConfigError::Invalid("max_occupancy must be at least 1".to_string()));
        }

        let half_extent = self.octree.world_half_extent;
        if half_extent.is_nan() || half_extent <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "world_half_extent must be positive, got {}",
                half_extent
            )));
        }

        if self.pool.growth_factor < 2 {
            return Err(ConfigError::Invalid(format!(
                "pool growth_factor must be at least 2, got {}",
                self.pool.growth_factor
            )));
        }

        if self.physics.furthest_point_tolerance < 0.0 {
            return Err(ConfigError::Invalid(
                "furthest_point_tolerance cannot be negative".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            octree: OctreeConfig::default(),
            pool: PoolConfig::default(),
            physics: PhysicsConfig::default(),
        }
    }
}

impl Config for SpatialConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("spatial_engine_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_defaults_match_documented_constants() {
        let config = SpatialConfig::default();
        assert_eq!(config.octree.max_occupancy, 3);
        assert_eq!(config.octree.max_depth, 3);
        assert_eq!(config.octree.world_half_extent, 100.0);
        assert_eq!(config.physics.furthest_point_tolerance, 0.001);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let path = temp_path("config.toml");
        let config = SpatialConfig::default().with_octree(OctreeConfig {
            max_occupancy: 8,
            max_depth: 5,
            world_half_extent: 250.0,
        });

        config.save_to_file(&path).unwrap();
        let loaded = SpatialConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let path = temp_path("partial.ron");
        std::fs::write(&path, "(octree: (max_depth: 6))").unwrap();
        let loaded = SpatialConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.octree.max_depth, 6);
        assert_eq!(loaded.octree.max_occupancy, 3);
        assert_eq!(loaded.pool, PoolConfig::default());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = SpatialConfig::default().save_to_file("config.json").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SpatialConfig::default();
        config.pool.growth_factor = 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SpatialConfig::default();
        config.octree.world_half_extent = 0.0;
        assert!(config.validate().is_err());
    }
}
