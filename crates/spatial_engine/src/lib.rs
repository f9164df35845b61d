//! # Spatial Engine
//!
//! Octree broad phase and collider geometry for real-time simulation.
//!
//! ## Features
//!
//! - **Incremental Octree**: a per-object membership log lets every tick repair
//!   only the nodes whose containment status changed
//! - **Four Collider Variants**: sphere, axis-aligned box, convex hull and ray,
//!   each with a world-space transform
//! - **Exact Narrow Phase**: separating-axis tests for hulls, slab and
//!   quadratic ray casts
//! - **Fixed-Slot Pools**: stable integer handles for entities and payloads
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spatial_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SpatialConfig::default();
//!     let mut world = World::new(&config.pool);
//!     let mut physics = PhysicsCollisionSystem::new(&config);
//!
//!     let ball = world.spawn(Frame::from_position(Vec3::new(1.0, 0.0, 0.0)));
//!     physics.attach_sphere(&mut world, ball, Sphere::new(Vec3::zeros(), 1.0))?;
//!
//!     let report = physics.step(&mut world)?;
//!     println!("{} pairs touching", report.collisions.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod debug;
pub mod ecs;
pub mod foundation;
pub mod physics;
pub mod spatial;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{PhysicsConfig, SpatialConfig},
        config::{Config, ConfigError},
        debug::{CollisionDebugVisualizer, DebugBox},
        ecs::{Entity, World},
        foundation::{
            math::{Frame, Quat, Vec3},
            pool::PoolConfig,
        },
        physics::{
            CollisionPair, ConvexHull, PhysicsCollisionSystem, PhysicsError, Ray, RayHit, Sphere, StepReport, AABB,
        },
        spatial::{Containment, IndexEvent, OctreeConfig, SpatialIndex},
    };
}
