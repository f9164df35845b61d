//! Entities and the frames that place them in the world
//!
//! Every simulated object lives in one slot of the [`World`]'s object pool,
//! so an [`Entity`] is just that slot's id and stays valid until despawned.

mod entity;
mod world;

pub use entity::Entity;
pub use world::{Body, World};
