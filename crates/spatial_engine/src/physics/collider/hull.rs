//! Convex hull collider payload
//!
//! A hull is a point cloud plus the faces that bound it. The unique face
//! normals and edge directions are derived once at initialization and are
//! the candidate separating axes for the narrow phase.

use super::{ColliderError, ColliderKind, ColliderShape, AABB};
use crate::foundation::math::{utils, Frame, Vec3};

/// Band below the maximum projection within which a point still counts as
/// furthest. One `f32::EPSILON` is added on top at every use.
pub const FURTHEST_POINT_TOLERANCE: f32 = 0.001;

/// One face of a hull: outward normal and indices into the point list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HullFace {
    /// Outward unit normal
    pub normal: Vec3,
    /// Indices of the face's points, in winding order
    pub indices: Vec<usize>,
}

impl HullFace {
    /// Creates a new face
    pub fn new(normal: Vec3, indices: Vec<usize>) -> Self {
        Self { normal, indices }
    }
}

/// Convex hull payload
///
/// In world space `points`, face normals, `axes` and `edges` have all been
/// taken through the frame. `bounds` caches the minimum enclosing box of the
/// points in whichever space the payload lives in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvexHull {
    points: Vec<Vec3>,
    faces: Vec<HullFace>,
    axes: Vec<Vec3>,
    edges: Vec<Vec3>,
    bounds: AABB,
}

impl ConvexHull {
    /// Build a hull, validating the face index lists
    pub fn new(points: Vec<Vec3>, faces: Vec<HullFace>) -> Result<Self, ColliderError> {
        let mut hull = Self::default();
        hull.initialize(points, faces)?;
        Ok(hull)
    }

    /// Axis-aligned box hull with the given half extents, centered on the origin
    pub fn cuboid(half_extents: Vec3) -> Self {
        let points = AABB::from_center_extents(Vec3::zeros(), half_extents)
            .corners()
            .to_vec();

        // Corner index bits: 1 = +X, 2 = +Y, 4 = +Z
        let faces = vec![
            HullFace::new(-Vec3::x(), vec![0, 2, 6, 4]),
            HullFace::new(Vec3::x(), vec![1, 5, 7, 3]),
            HullFace::new(-Vec3::y(), vec![0, 4, 5, 1]),
            HullFace::new(Vec3::y(), vec![2, 3, 7, 6]),
            HullFace::new(-Vec3::z(), vec![0, 1, 3, 2]),
            HullFace::new(Vec3::z(), vec![4, 6, 7, 5]),
        ];

        let mut hull = Self::default();
        hull.set_unchecked(points, faces);
        hull
    }

    /// Overwrite the payload. Face indices must reference existing points;
    /// on error the payload is left untouched.
    pub fn initialize(&mut self, points: Vec<Vec3>, faces: Vec<HullFace>) -> Result<(), ColliderError> {
        for (face_index, face) in faces.iter().enumerate() {
            if face.indices.is_empty() {
                log::warn!("Rejected hull: face {} has no points", face_index);
                return Err(ColliderError::EmptyFace { face: face_index });
            }
            if let Some(&bad) = face.indices.iter().find(|&&i| i >= points.len()) {
                log::warn!(
                    "Rejected hull: face {} references point {} of {}",
                    face_index,
                    bad,
                    points.len()
                );
                return Err(ColliderError::InvalidFaceIndex {
                    face: face_index,
                    index: bad,
                    point_count: points.len(),
                });
            }
        }

        self.set_unchecked(points, faces);
        Ok(())
    }

    fn set_unchecked(&mut self, points: Vec<Vec3>, mut faces: Vec<HullFace>) {
        for face in &mut faces {
            face.normal = face
                .normal
                .try_normalize(f32::EPSILON)
                .or_else(|| plane_normal(&points, &face.indices))
                .unwrap_or_else(Vec3::zeros);
        }

        self.axes.clear();
        self.edges.clear();
        for face in &faces {
            push_unique_axis(&mut self.axes, face.normal);

            let count = face.indices.len();
            for i in 0..count {
                let a = points[face.indices[i]];
                let b = points[face.indices[(i + 1) % count]];
                push_unique_axis(&mut self.edges, b - a);
            }
        }

        self.points = points;
        self.faces = faces;
        self.bounds = self.minimum_aabb(&Frame::identity());
    }

    /// Hull points
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Hull faces
    pub fn faces(&self) -> &[HullFace] {
        &self.faces
    }

    /// Unique face-normal directions
    pub fn axes(&self) -> &[Vec3] {
        &self.axes
    }

    /// Unique edge directions
    pub fn edges(&self) -> &[Vec3] {
        &self.edges
    }

    /// Cached minimum enclosing box of the points
    pub fn bounds(&self) -> AABB {
        self.bounds
    }

    /// Apply rotation∘scale and then the frame position to every point
    pub fn oriented_points(&self, frame: &Frame, dest: &mut Vec<Vec3>) {
        dest.clear();
        dest.extend(self.points.iter().map(|p| frame.transform_point(p)));
    }

    /// Apply rotation∘scale to every face axis (renormalized, no translation).
    /// Only perpendicular to the faces under uniform scale; world-space
    /// payloads take their axes from the transformed face normals instead.
    pub fn oriented_axes(&self, frame: &Frame, dest: &mut Vec<Vec3>) {
        orient_directions(&self.axes, frame, dest);
    }

    /// Apply rotation∘scale to every edge direction (renormalized, no translation)
    pub fn oriented_edges(&self, frame: &Frame, dest: &mut Vec<Vec3>) {
        orient_directions(&self.edges, frame, dest);
    }

    /// Minimum axis-aligned box around the hull placed by `frame`
    ///
    /// A hull without points yields a zero-extent box at the frame position.
    pub fn minimum_aabb(&self, frame: &Frame) -> AABB {
        let mut transformed = self.points.iter().map(|p| frame.transform_point(p));

        let Some(first) = transformed.next() else {
            return AABB::from_center_extents(frame.position, Vec3::zeros());
        };

        let (min, max) = transformed.fold((first, first), |(min, max), p| (min.inf(&p), max.sup(&p)));

        let centroid = (min + max) * 0.5;
        let half_extents = (max - min) * 0.5;
        AABB::from_center_extents(centroid, half_extents)
    }

    /// Projection interval of the points onto `axis`, or `None` without points
    pub fn project(&self, axis: &Vec3) -> Option<(f32, f32)> {
        project_points(&self.points, axis)
    }

    /// Every point whose projection onto `direction` lies within
    /// [`FURTHEST_POINT_TOLERANCE`] of the maximum. Ties are all returned.
    pub fn furthest_points_in_direction(points: &[Vec3], direction: &Vec3) -> Vec<Vec3> {
        Self::furthest_points_with_tolerance(points, direction, FURTHEST_POINT_TOLERANCE)
    }

    /// [`Self::furthest_points_in_direction`] with an explicit tolerance
    pub fn furthest_points_with_tolerance(points: &[Vec3], direction: &Vec3, tolerance: f32) -> Vec<Vec3> {
        let Some((_, max)) = project_points(points, direction) else {
            return Vec::new();
        };

        let threshold = max - tolerance - f32::EPSILON;
        points
            .iter()
            .filter(|p| p.dot(direction) >= threshold)
            .copied()
            .collect()
    }
}

impl ColliderShape for ConvexHull {
    const KIND: ColliderKind = ColliderKind::ConvexHull;

    /// Points and edges go through rotation∘scale. Face normals go through
    /// the inverse-transpose so that they stay perpendicular to their faces
    /// under non-uniform scale, and the world axes are rebuilt from them.
    fn to_world_space(&self, frame: &Frame, dest: &mut Self) {
        self.oriented_points(frame, &mut dest.points);
        self.oriented_edges(frame, &mut dest.edges);

        dest.faces.clear();
        dest.faces.extend(self.faces.iter().map(|face| HullFace {
            normal: frame
                .orient_normal(&face.normal)
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(Vec3::zeros),
            indices: face.indices.clone(),
        }));

        dest.axes.clear();
        for face in &dest.faces {
            push_unique_axis(&mut dest.axes, face.normal);
        }

        dest.bounds = self.minimum_aabb(frame);
    }

    fn world_bounds(&self) -> Option<AABB> {
        Some(self.bounds)
    }
}

/// Min/max of `points` projected onto `axis`
pub(crate) fn project_points(points: &[Vec3], axis: &Vec3) -> Option<(f32, f32)> {
    let mut projections = points.iter().map(|p| p.dot(axis));
    let first = projections.next()?;
    Some(projections.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

fn orient_directions(source: &[Vec3], frame: &Frame, dest: &mut Vec<Vec3>) {
    dest.clear();
    dest.extend(
        source
            .iter()
            .map(|v| frame.orient(v).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros)),
    );
}

fn push_unique_axis(axes: &mut Vec<Vec3>, direction: Vec3) {
    let Some(direction) = direction.try_normalize(f32::EPSILON) else {
        return;
    };
    if !axes.iter().any(|axis| utils::same_axis(axis, &direction)) {
        axes.push(direction);
    }
}

fn plane_normal(points: &[Vec3], indices: &[usize]) -> Option<Vec3> {
    match indices {
        [a, b, c, ..] => {
            let (a, b, c) = (points[*a], points[*b], points[*c]);
            (b - a).cross(&(c - a)).try_normalize(f32::EPSILON)
        }
        _ => None,
    }
}
