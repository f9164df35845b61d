//! Payload storage for every collider variant

use super::{
    ColliderError, ColliderHandle, ColliderShape, ConvexHull, Ray, ShapeRef, Sphere, AABB,
};
use crate::foundation::math::Frame;
use crate::foundation::pool::{PairedPool, PoolConfig, PoolError, PoolId};

/// Model-space and world-space payload pools for all four variants
#[derive(Debug, Clone)]
pub struct ColliderStore {
    spheres: PairedPool<Sphere>,
    boxes: PairedPool<AABB>,
    hulls: PairedPool<ConvexHull>,
    rays: PairedPool<Ray>,
}

impl ColliderStore {
    /// Create empty pools
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            spheres: PairedPool::new(config),
            boxes: PairedPool::new(config),
            hulls: PairedPool::new(config),
            rays: PairedPool::new(config),
        }
    }

    /// Store a sphere and build its world-space copy
    pub fn create_sphere(&mut self, sphere: Sphere, frame: &Frame) -> Result<ColliderHandle, ColliderError> {
        Ok(ColliderHandle::Sphere(create(&mut self.spheres, sphere, frame)?))
    }

    /// Store a box and build its world-space copy
    pub fn create_aabb(&mut self, aabb: AABB, frame: &Frame) -> Result<ColliderHandle, ColliderError> {
        Ok(ColliderHandle::Aabb(create(&mut self.boxes, aabb, frame)?))
    }

    /// Store a hull and build its world-space copy
    pub fn create_hull(&mut self, hull: ConvexHull, frame: &Frame) -> Result<ColliderHandle, ColliderError> {
        Ok(ColliderHandle::ConvexHull(create(&mut self.hulls, hull, frame)?))
    }

    /// Store a ray and build its world-space copy
    pub fn create_ray(&mut self, ray: Ray, frame: &Frame) -> Result<ColliderHandle, ColliderError> {
        Ok(ColliderHandle::Ray(create(&mut self.rays, ray, frame)?))
    }

    /// Release the model-space and world-space payloads of `handle`
    pub fn free(&mut self, handle: ColliderHandle) -> Result<(), ColliderError> {
        match handle {
            ColliderHandle::Sphere(id) => self.spheres.free(id)?,
            ColliderHandle::Aabb(id) => self.boxes.free(id)?,
            ColliderHandle::ConvexHull(id) => self.hulls.free(id)?,
            ColliderHandle::Ray(id) => self.rays.free(id)?,
        }
        Ok(())
    }

    /// Rebuild the world-space payload from the model payload and `frame`
    pub fn update_world(&mut self, handle: ColliderHandle, frame: &Frame) -> Result<(), ColliderError> {
        match handle {
            ColliderHandle::Sphere(id) => refresh(&mut self.spheres, id, frame)?,
            ColliderHandle::Aabb(id) => refresh(&mut self.boxes, id, frame)?,
            ColliderHandle::ConvexHull(id) => refresh(&mut self.hulls, id, frame)?,
            ColliderHandle::Ray(id) => refresh(&mut self.rays, id, frame)?,
        }
        Ok(())
    }

    /// Cached world-space payload
    pub fn world_shape(&self, handle: ColliderHandle) -> Option<ShapeRef<'_>> {
        Some(match handle {
            ColliderHandle::Sphere(id) => ShapeRef::Sphere(self.spheres.world(id)?),
            ColliderHandle::Aabb(id) => ShapeRef::Aabb(self.boxes.world(id)?),
            ColliderHandle::ConvexHull(id) => ShapeRef::ConvexHull(self.hulls.world(id)?),
            ColliderHandle::Ray(id) => ShapeRef::Ray(self.rays.world(id)?),
        })
    }

    /// Model-space payload as authored
    pub fn model_shape(&self, handle: ColliderHandle) -> Option<ShapeRef<'_>> {
        Some(match handle {
            ColliderHandle::Sphere(id) => ShapeRef::Sphere(self.spheres.model(id)?),
            ColliderHandle::Aabb(id) => ShapeRef::Aabb(self.boxes.model(id)?),
            ColliderHandle::ConvexHull(id) => ShapeRef::ConvexHull(self.hulls.model(id)?),
            ColliderHandle::Ray(id) => ShapeRef::Ray(self.rays.model(id)?),
        })
    }

    /// Broad-phase bounds of the cached world-space payload
    pub fn world_bounds(&self, handle: ColliderHandle) -> Option<AABB> {
        self.world_shape(handle)?.bounds()
    }

    /// Number of live payloads across all variants
    pub fn len(&self) -> usize {
        self.spheres.len() + self.boxes.len() + self.hulls.len() + self.rays.len()
    }

    /// Whether no payload is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ColliderStore {
    fn default() -> Self {
        Self::new(&PoolConfig::default())
    }
}

fn create<T: ColliderShape>(pool: &mut PairedPool<T>, value: T, frame: &Frame) -> Result<PoolId, PoolError> {
    let id = pool.allocate()?;
    if let Some(model) = pool.model_mut(id) {
        *model = value;
    }
    refresh(pool, id, frame)?;

    log::trace!("Created {} collider {}", T::KIND, id);
    Ok(id)
}

fn refresh<T: ColliderShape>(pool: &mut PairedPool<T>, id: PoolId, frame: &Frame) -> Result<(), PoolError> {
    let (model, world) = pool.split_mut(id)?;
    model.to_world_space(frame, world);
    Ok(())
}
