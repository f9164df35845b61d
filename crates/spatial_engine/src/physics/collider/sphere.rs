//! Sphere collider payload

use super::{ColliderKind, ColliderShape, AABB};
use super::ray::Ray;
use crate::foundation::math::{Frame, Vec3};

/// A sphere: center offset and radius
///
/// In model space the center is relative to the owning frame. The world-space
/// copy carries the transformed center and the radius scaled by the frame's
/// largest absolute scale factor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sphere {
    /// The center position of the sphere
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl Sphere {
    /// Creates a new sphere with the given center and radius. A negative
    /// radius is stored by magnitude.
    pub fn new(center: Vec3, radius: f32) -> Self {
        let mut sphere = Self::default();
        sphere.initialize(center, radius);
        sphere
    }

    /// Overwrite the payload
    pub fn initialize(&mut self, center: Vec3, radius: f32) {
        self.center = center;
        self.radius = radius.abs();
    }

    /// Axis-aligned bounds
    pub fn bounds(&self) -> AABB {
        let r = Vec3::new(self.radius, self.radius, self.radius);
        AABB::from_center_extents(self.center, r)
    }

    /// Check if this sphere intersects with another
    pub fn intersects(&self, other: &Sphere) -> bool {
        let distance_squared = (self.center - other.center).magnitude_squared();
        let radius_sum = self.radius + other.radius;
        distance_squared <= radius_sum * radius_sum
    }

    /// Check if this sphere touches a box
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        let closest = aabb.closest_point(&self.center);
        (closest - self.center).magnitude_squared() <= self.radius * self.radius
    }

    /// Test ray intersection with this sphere
    /// Returns (distance, hit_point, normal) if hit, None otherwise
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, Vec3, Vec3)> {
        // Vector from ray origin to sphere center
        let oc = ray.origin - self.center;

        // Solve: |origin + t*direction - center|^2 = radius^2
        let a = ray.direction.dot(&ray.direction);
        if a == 0.0 {
            return None;
        }
        let b = 2.0 * oc.dot(&ray.direction);
        let c = oc.dot(&oc) - self.radius * self.radius;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_discriminant = discriminant.sqrt();
        let t1 = (-b - sqrt_discriminant) / (2.0 * a);
        let t2 = (-b + sqrt_discriminant) / (2.0 * a);

        // Closest non-negative intersection; origin inside the sphere hits at 0
        let t = if t1 >= 0.0 {
            t1
        } else if t2 >= 0.0 {
            0.0
        } else {
            return None;
        };

        let hit_point = ray.point_at(t);
        let offset = hit_point - self.center;
        let normal = offset.try_normalize(f32::EPSILON).unwrap_or_else(|| -ray.direction);

        Some((t, hit_point, normal))
    }
}

impl ColliderShape for Sphere {
    const KIND: ColliderKind = ColliderKind::Sphere;

    fn to_world_space(&self, frame: &Frame, dest: &mut Self) {
        dest.center = frame.transform_point(&self.center);
        dest.radius = self.radius * frame.max_scale();
    }

    fn world_bounds(&self) -> Option<AABB> {
        Some(self.bounds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_world_space_uses_max_scale() {
        let model = Sphere::new(Vec3::new(1.0, 0.0, 0.0), 2.0);
        let frame = Frame::from_position(Vec3::new(0.0, 10.0, 0.0))
            .with_scale(Vec3::new(1.0, -3.0, 2.0));

        let mut world = Sphere::default();
        model.to_world_space(&frame, &mut world);

        assert_relative_eq!(world.center, Vec3::new(1.0, 10.0, 0.0));
        assert_relative_eq!(world.radius, 6.0);
    }

    #[test]
    fn test_negative_radius_is_stored_by_magnitude() {
        let sphere = Sphere::new(Vec3::new(1.0, 0.0, 0.0), -2.0);
        assert_relative_eq!(sphere.radius, 2.0);

        let bounds = sphere.bounds();
        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, -2.0));
        assert_eq!(bounds.max, Vec3::new(3.0, 2.0, 2.0));
    }

    #[test]
    fn test_touching_spheres_intersect() {
        let a = Sphere::new(Vec3::zeros(), 1.0);
        let b = Sphere::new(Vec3::new(2.0, 0.0, 0.0), 1.0);
        let c = Sphere::new(Vec3::new(2.1, 0.0, 0.0), 1.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_sphere_box() {
        let sphere = Sphere::new(Vec3::new(3.0, 0.0, 0.0), 1.0);
        assert!(sphere.intersects_aabb(&AABB::cube(2.0)));
        assert!(!sphere.intersects_aabb(&AABB::cube(1.5)));
    }

    #[test]
    fn test_ray_hits_front_face() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -10.0), 2.0);
        let ray = Ray::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));

        let (t, point, normal) = sphere.intersect_ray(&ray).unwrap();
        assert_relative_eq!(t, 8.0, epsilon = 1e-5);
        assert_relative_eq!(point, Vec3::new(0.0, 0.0, -8.0), epsilon = 1e-5);
        assert_relative_eq!(normal, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_degenerate_sphere_only_touches_its_point() {
        let point = Sphere::new(Vec3::new(1.0, 1.0, 1.0), 0.0);
        assert!(point.intersects(&Sphere::new(Vec3::new(1.0, 1.0, 1.0), 0.0)));
        assert!(!point.intersects(&Sphere::new(Vec3::zeros(), 0.0)));
    }
}
