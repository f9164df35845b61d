//! Narrow-phase intersection tests
//!
//! Boolean overlap tests between world-space collider payloads, plus ray
//! casts. Hull tests use the Separating Axis Theorem: the shapes are disjoint
//! exactly when some axis exists on which their projections do not overlap.
//! Candidate axes are the world coordinate axes, every face axis, and the
//! cross products of edge directions.

use super::collider::{ConvexHull, Ray, ShapeRef, Sphere, AABB};
use crate::foundation::math::{utils, Vec3};

const AXIS_EPSILON: f32 = 1.0e-6;

/// Test if two world-space shapes touch. Touching counts; rays never hit rays.
pub fn shapes_intersect(a: &ShapeRef<'_>, b: &ShapeRef<'_>) -> bool {
    match (a, b) {
        (ShapeRef::Ray(_), ShapeRef::Ray(_)) => false,
        (ShapeRef::Ray(ray), other) | (other, ShapeRef::Ray(ray)) => ray_distance(ray, other).is_some(),

        (ShapeRef::Sphere(a), ShapeRef::Sphere(b)) => a.intersects(b),
        (ShapeRef::Aabb(a), ShapeRef::Aabb(b)) => a.intersects(b),
        (ShapeRef::Sphere(sphere), ShapeRef::Aabb(aabb))
        | (ShapeRef::Aabb(aabb), ShapeRef::Sphere(sphere)) => sphere.intersects_aabb(aabb),

        (ShapeRef::ConvexHull(a), ShapeRef::ConvexHull(b)) => hull_intersects_hull(a, b),
        (ShapeRef::ConvexHull(hull), ShapeRef::Sphere(sphere))
        | (ShapeRef::Sphere(sphere), ShapeRef::ConvexHull(hull)) => hull_intersects_sphere(hull, sphere),
        (ShapeRef::ConvexHull(hull), ShapeRef::Aabb(aabb))
        | (ShapeRef::Aabb(aabb), ShapeRef::ConvexHull(hull)) => hull_intersects_aabb(hull, aabb),
    }
}

/// Distance along `ray` to the first point of `shape`, if hit
pub fn ray_distance(ray: &Ray, shape: &ShapeRef<'_>) -> Option<f32> {
    ray_hit(ray, shape).map(|(distance, _, _)| distance)
}

/// Ray intersection with a shape
/// Returns (distance, hit_point, normal) if hit, None otherwise
///
/// A ray starting inside the shape hits at distance 0 with the normal facing
/// back along the ray.
pub fn ray_hit(ray: &Ray, shape: &ShapeRef<'_>) -> Option<(f32, Vec3, Vec3)> {
    match shape {
        ShapeRef::Sphere(sphere) => sphere.intersect_ray(ray),
        ShapeRef::Aabb(aabb) => ray_hit_aabb(ray, aabb),
        ShapeRef::ConvexHull(hull) => ray_hit_hull(ray, hull),
        ShapeRef::Ray(_) => None,
    }
}

/// SAT between two hulls
pub fn hull_intersects_hull(a: &ConvexHull, b: &ConvexHull) -> bool {
    if a.points().is_empty() || b.points().is_empty() {
        return false;
    }

    let separated = |axis: &Vec3| match (a.project(axis), b.project(axis)) {
        (Some(pa), Some(pb)) => !intervals_overlap(pa, pb),
        _ => true,
    };

    // Test 1: world axes and both sets of face axes
    let face_axes = cardinal_axes().into_iter().chain(a.axes().iter().copied()).chain(b.axes().iter().copied());
    for axis in face_axes {
        if separated(&axis) {
            return false;
        }
    }

    // Test 2: edge-edge cross products
    for edge_a in a.edges() {
        for edge_b in b.edges() {
            if let Some(axis) = usable_axis(edge_a.cross(edge_b)) {
                if separated(&axis) {
                    return false;
                }
            }
        }
    }

    // No separating axis found
    true
}

/// SAT between a hull and a sphere
///
/// Besides the face axes, every direction from the sphere center to the
/// closest point of a hull edge is tested, which makes the test exact for
/// vertex and edge contacts. Hulls without faces use their points instead.
pub fn hull_intersects_sphere(hull: &ConvexHull, sphere: &Sphere) -> bool {
    if hull.points().is_empty() {
        return false;
    }

    let sphere_interval = |axis: &Vec3| {
        let center = sphere.center.dot(axis);
        (center - sphere.radius, center + sphere.radius)
    };

    let axes = cardinal_axes()
        .into_iter()
        .chain(hull.axes().iter().copied())
        .chain(feature_axes(hull, &sphere.center));

    for axis in axes {
        if let Some(hull_interval) = hull.project(&axis) {
            if !intervals_overlap(hull_interval, sphere_interval(&axis)) {
                return false;
            }
        }
    }

    true
}

/// Directions from `center` to the closest point of every hull edge
fn feature_axes<'a>(hull: &'a ConvexHull, center: &'a Vec3) -> Box<dyn Iterator<Item = Vec3> + 'a> {
    let points = hull.points();
    if hull.faces().is_empty() {
        return Box::new(points.iter().filter_map(move |p| usable_axis(p - center)));
    }

    Box::new(hull.faces().iter().flat_map(move |face| {
        let count = face.indices.len();
        (0..count).filter_map(move |i| {
            let a = points[face.indices[i]];
            let b = points[face.indices[(i + 1) % count]];
            usable_axis(closest_on_segment(&a, &b, center) - center)
        })
    }))
}

fn closest_on_segment(a: &Vec3, b: &Vec3, point: &Vec3) -> Vec3 {
    let ab = b - a;
    let length_squared = ab.norm_squared();
    if length_squared == 0.0 {
        return *a;
    }
    let t = ((point - a).dot(&ab) / length_squared).clamp(0.0, 1.0);
    a + ab * t
}

/// SAT between a hull and an axis-aligned box
pub fn hull_intersects_aabb(hull: &ConvexHull, aabb: &AABB) -> bool {
    if hull.points().is_empty() {
        return false;
    }

    let center = aabb.center();
    let extents = aabb.extents();
    let box_interval = |axis: &Vec3| {
        let mid = center.dot(axis);
        let radius = extents.dot(&utils::abs(axis));
        (mid - radius, mid + radius)
    };

    let separated = |axis: &Vec3| match hull.project(axis) {
        Some(hull_interval) => !intervals_overlap(hull_interval, box_interval(axis)),
        None => true,
    };

    for axis in cardinal_axes().into_iter().chain(hull.axes().iter().copied()) {
        if separated(&axis) {
            return false;
        }
    }

    for edge in hull.edges() {
        for box_edge in cardinal_axes() {
            if let Some(axis) = usable_axis(edge.cross(&box_edge)) {
                if separated(&axis) {
                    return false;
                }
            }
        }
    }

    true
}

fn ray_hit_aabb(ray: &Ray, aabb: &AABB) -> Option<(f32, Vec3, Vec3)> {
    let t = ray.intersect_aabb(aabb)?;
    let point = ray.point_at(t);
    if t == 0.0 {
        return Some((t, point, -ray.direction));
    }

    // The entry face is the one whose axis the hit point is furthest along
    let offset = point - aabb.center();
    let extents = aabb.extents();
    let mut normal = Vec3::zeros();
    let mut best = f32::NEG_INFINITY;
    for axis in 0..3 {
        let ratio = if extents[axis] > 0.0 {
            offset[axis].abs() / extents[axis]
        } else {
            f32::INFINITY
        };
        if ratio > best {
            best = ratio;
            normal = Vec3::zeros();
            normal[axis] = offset[axis].signum();
        }
    }

    Some((t, point, normal))
}

/// Clip the ray against every face plane of the hull
fn ray_hit_hull(ray: &Ray, hull: &ConvexHull) -> Option<(f32, Vec3, Vec3)> {
    let points = hull.points();
    if hull.faces().is_empty() {
        return None;
    }

    let mut t_enter = 0.0_f32;
    let mut t_exit = f32::INFINITY;
    let mut entry_normal = -ray.direction;

    for face in hull.faces() {
        let normal = face.normal;
        if normal == Vec3::zeros() {
            continue;
        }

        let on_plane = points[face.indices[0]];
        let distance = normal.dot(&(on_plane - ray.origin));
        let approach = normal.dot(&ray.direction);

        if approach.abs() < AXIS_EPSILON {
            // Parallel to this face: outside it means a miss
            if distance < 0.0 {
                return None;
            }
            continue;
        }

        let t = distance / approach;
        if approach < 0.0 {
            if t > t_enter {
                t_enter = t;
                entry_normal = normal;
            }
        } else {
            t_exit = t_exit.min(t);
        }

        if t_enter > t_exit {
            return None;
        }
    }

    Some((t_enter, ray.point_at(t_enter), entry_normal))
}

fn intervals_overlap((min1, max1): (f32, f32), (min2, max2): (f32, f32)) -> bool {
    max1 >= min2 && max2 >= min1
}

fn cardinal_axes() -> [Vec3; 3] {
    [Vec3::x(), Vec3::y(), Vec3::z()]
}

/// Normalized axis, or `None` if degenerate
fn usable_axis(axis: Vec3) -> Option<Vec3> {
    if axis.magnitude_squared() < AXIS_EPSILON {
        return None;
    }
    Some(axis.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Frame, Quat};
    use crate::physics::collider::{ColliderShape, HullFace};
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_4;

    fn cube_at(frame: &Frame) -> ConvexHull {
        let mut world = ConvexHull::default();
        ConvexHull::cuboid(Vec3::new(1.0, 1.0, 1.0)).to_world_space(frame, &mut world);
        world
    }

    fn diamond_at(position: Vec3) -> ConvexHull {
        let frame = Frame::from_position_rotation(position, Quat::from_axis_angle(&Vec3::z_axis(), FRAC_PI_4));
        cube_at(&frame)
    }

    /// Prism with a face on x + y = 1, stretched 4x along X so that face
    /// becomes x / 4 + y = 1
    fn stretched_wedge() -> ConvexHull {
        let points = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ];
        let faces = vec![
            HullFace::new(-Vec3::z(), vec![0, 2, 1]),
            HullFace::new(Vec3::z(), vec![3, 4, 5]),
            HullFace::new(-Vec3::x(), vec![0, 3, 5, 2]),
            HullFace::new(-Vec3::y(), vec![0, 1, 4, 3]),
            HullFace::new(Vec3::new(1.0, 1.0, 0.0), vec![1, 2, 5, 4]),
        ];
        let model = ConvexHull::new(points, faces).unwrap();

        let mut world = ConvexHull::default();
        model.to_world_space(&Frame::identity().with_scale(Vec3::new(4.0, 1.0, 1.0)), &mut world);
        world
    }

    #[test]
    fn test_hulls_overlapping_and_apart() {
        let a = cube_at(&Frame::identity());
        let b = cube_at(&Frame::from_position(Vec3::new(1.5, 0.0, 0.0)));
        let c = cube_at(&Frame::from_position(Vec3::new(2.5, 0.0, 0.0)));

        assert!(hull_intersects_hull(&a, &b));
        assert!(!hull_intersects_hull(&a, &c));
    }

    #[test]
    fn test_hull_separated_on_face_axis_despite_box_overlap() {
        let a = cube_at(&Frame::identity());
        let b = diamond_at(Vec3::new(2.2, 2.2, 0.0));

        // Their enclosing boxes overlap...
        assert!(a.bounds().intersects(&b.bounds()));
        // ...but the rotated face axis separates them
        assert!(!hull_intersects_hull(&a, &b));
    }

    #[test]
    fn test_hull_sphere_uses_edge_axes() {
        let cube = cube_at(&Frame::identity());

        assert!(!hull_intersects_sphere(&cube, &Sphere::new(Vec3::new(2.5, 0.0, 0.0), 1.0)));
        assert!(hull_intersects_sphere(&cube, &Sphere::new(Vec3::new(2.5, 0.0, 0.0), 1.6)));

        // Beside a vertical edge: bounds overlap, but the edge axis separates
        let near_edge = Sphere::new(Vec3::new(1.6, 1.6, 0.0), 0.8);
        assert!(near_edge.bounds().intersects(&cube.bounds()));
        assert!(!hull_intersects_sphere(&cube, &near_edge));

        let touching_edge = Sphere::new(Vec3::new(1.6, 1.6, 0.0), 0.9);
        assert!(hull_intersects_sphere(&cube, &touching_edge));
    }

    #[test]
    fn test_hull_aabb() {
        let diamond = diamond_at(Vec3::new(2.2, 2.2, 0.0));
        assert!(!hull_intersects_aabb(&diamond, &AABB::cube(1.0)));

        let around = AABB::from_center_extents(Vec3::new(2.2, 2.2, 0.0), Vec3::new(0.5, 0.5, 0.5));
        assert!(hull_intersects_aabb(&diamond, &around));
    }

    #[test]
    fn test_empty_hull_never_intersects() {
        let empty = ConvexHull::default();
        let cube = cube_at(&Frame::identity());
        assert!(!hull_intersects_hull(&empty, &cube));
        assert!(!hull_intersects_sphere(&empty, &Sphere::new(Vec3::zeros(), 5.0)));
        assert!(!hull_intersects_aabb(&empty, &AABB::cube(5.0)));
    }

    #[test]
    fn test_ray_hull_clipping() {
        let cube = cube_at(&Frame::identity());
        let shape = ShapeRef::ConvexHull(&cube);

        let ray = Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::x());
        let (t, point, normal) = ray_hit(&ray, &shape).unwrap();
        assert_relative_eq!(t, 4.0, epsilon = 1e-5);
        assert_relative_eq!(point, Vec3::new(-1.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(normal, -Vec3::x(), epsilon = 1e-5);

        let parallel = Ray::new(Vec3::new(-5.0, 2.0, 0.0), Vec3::x());
        assert!(ray_distance(&parallel, &shape).is_none());

        let away = Ray::new(Vec3::new(-5.0, 0.0, 0.0), -Vec3::x());
        assert!(ray_distance(&away, &shape).is_none());

        let inside = Ray::new(Vec3::zeros(), Vec3::y());
        assert_eq!(ray_distance(&inside, &shape), Some(0.0));
    }

    #[test]
    fn test_stretched_hull_ray_hits_slanted_face() {
        let wedge = stretched_wedge();
        let shape = ShapeRef::ConvexHull(&wedge);

        let ray = Ray::new(Vec3::new(2.0, 5.0, 0.5), -Vec3::y());
        let (t, point, normal) = ray_hit(&ray, &shape).unwrap();
        assert_relative_eq!(t, 4.5, epsilon = 1e-4);
        assert_relative_eq!(point, Vec3::new(2.0, 0.5, 0.5), epsilon = 1e-4);
        assert_relative_eq!(normal, Vec3::new(1.0, 4.0, 0.0).normalize(), epsilon = 1e-5);

        // Inside the bounding box but outside the slanted face
        let miss = Ray::new(Vec3::new(3.0, 0.5, 0.5), Vec3::z());
        assert!(wedge.bounds().contains_point(miss.origin));
        assert!(ray_distance(&miss, &shape).is_none());
    }

    #[test]
    fn test_stretched_hull_separates_on_slanted_face() {
        let wedge = stretched_wedge();
        let on_face = Vec3::new(2.0, 0.5, 0.5);
        let outward = Vec3::new(1.0, 4.0, 0.0).normalize();

        let clear = Sphere::new(on_face + outward * 0.6, 0.5);
        assert!(clear.bounds().intersects(&wedge.bounds()));
        assert!(!hull_intersects_sphere(&wedge, &clear));

        let sunk = Sphere::new(on_face + outward * 0.45, 0.5);
        assert!(hull_intersects_sphere(&wedge, &sunk));

        // A small cube whose corner stays 0.1 off the face
        let reach = 0.25 * (outward.x.abs() + outward.y.abs());
        let cube_frame = Frame::from_position(on_face + outward * (reach + 0.1));
        let mut cube = ConvexHull::default();
        ConvexHull::cuboid(Vec3::new(0.25, 0.25, 0.25)).to_world_space(&cube_frame, &mut cube);
        assert!(cube.bounds().intersects(&wedge.bounds()));
        assert!(!hull_intersects_hull(&wedge, &cube));
        assert!(!hull_intersects_hull(&cube, &wedge));
    }

    #[test]
    fn test_ray_aabb_normal() {
        let aabb = AABB::cube(1.0);
        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), -Vec3::y());
        let (t, _, normal) = ray_hit(&ray, &ShapeRef::Aabb(&aabb)).unwrap();
        assert_relative_eq!(t, 4.0);
        assert_relative_eq!(normal, Vec3::y());
    }

    #[test]
    fn test_shape_dispatch() {
        let sphere = Sphere::new(Vec3::new(1.5, 0.0, 0.0), 1.0);
        let aabb = AABB::cube(1.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -10.0), Vec3::z());
        let other_ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), -Vec3::z());

        assert!(shapes_intersect(&ShapeRef::Sphere(&sphere), &ShapeRef::Aabb(&aabb)));
        assert!(shapes_intersect(&ShapeRef::Aabb(&aabb), &ShapeRef::Ray(&ray)));
        assert!(shapes_intersect(&ShapeRef::Ray(&ray), &ShapeRef::Aabb(&aabb)));
        assert!(!shapes_intersect(&ShapeRef::Ray(&ray), &ShapeRef::Ray(&other_ray)));
    }
}
