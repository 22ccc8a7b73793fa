//! Frustum extraction and containment tests
//!
//! Planes are pulled straight out of a (model-)view-projection matrix with the
//! Gribb-Hartmann method, so testing against the frustum of `vp * model`
//! happens in model space with no per-vertex transform. The matrix must use
//! OpenGL clip conventions (`-w <= x, y, z <= w`).

use crate::foundation::math::{Mat4, Vec3, Vec4};

/// Plane `normal · p + distance = 0`; the positive side is inside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal pointing into the frustum
    pub normal: Vec3,
    /// Signed offset from the origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance, normalized by `|normal|`
    pub fn new(normal: Vec3, distance: f32) -> Self {
        let length = normal.norm().max(1e-6);
        Self { normal: normal / length, distance: distance / length }
    }

    /// Plane from `(a, b, c, d)` coefficients, normalized by `|(a, b, c)|`
    pub fn from_coefficients(coefficients: Vec4) -> Self {
        Self::new(coefficients.xyz(), coefficients.w)
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// Where a volume lies relative to the frustum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// Entirely outside at least one plane
    Outside,
    /// Straddles one or more planes
    Intersecting,
    /// On the inner side of every plane
    Inside,
}

/// Six clip planes in the order right, left, bottom, top, far, near
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// The planes
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Index of the right plane
    pub const RIGHT: usize = 0;
    /// Index of the left plane
    pub const LEFT: usize = 1;
    /// Index of the bottom plane
    pub const BOTTOM: usize = 2;
    /// Index of the top plane
    pub const TOP: usize = 3;
    /// Index of the far plane
    pub const FAR: usize = 4;
    /// Index of the near plane
    pub const NEAR: usize = 5;

    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a (model-)view-projection matrix.
    ///
    /// Each plane is the fourth matrix row plus or minus one of the first three.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let row = |i: usize| {
            Vec4::new(matrix[(i, 0)], matrix[(i, 1)], matrix[(i, 2)], matrix[(i, 3)])
        };
        let (x, y, z, w) = (row(0), row(1), row(2), row(3));

        Self::new([
            Plane::from_coefficients(w - x),
            Plane::from_coefficients(w + x),
            Plane::from_coefficients(w + y),
            Plane::from_coefficients(w - y),
            Plane::from_coefficients(w - z),
            Plane::from_coefficients(w + z),
        ])
    }

    /// True if the point is on the inner side of every plane
    pub fn contains_point(&self, point: &Vec3) -> bool {
        self.planes.iter().all(|p| p.distance_to_point(point) > 0.0)
    }

    /// Classify a sphere
    pub fn classify_sphere(&self, center: &Vec3, radius: f32) -> Containment {
        let mut result = Containment::Inside;
        for plane in &self.planes {
            let distance = plane.distance_to_point(center);
            if distance < -radius {
                return Containment::Outside;
            }
            if distance < radius {
                result = Containment::Intersecting;
            }
        }
        result
    }

    /// True unless the sphere is entirely outside one plane
    pub fn intersects_sphere(&self, center: &Vec3, radius: f32) -> bool {
        self.classify_sphere(center, radius) != Containment::Outside
    }

    /// Classify a box with its positive and negative vertices per plane
    pub fn classify_box(&self, min: &Vec3, max: &Vec3) -> Containment {
        let mut result = Containment::Inside;
        for plane in &self.planes {
            // the corner furthest along the normal, and its opposite
            let mut positive = *min;
            let mut negative = *max;
            for axis in 0..3 {
                if plane.normal[axis] >= 0.0 {
                    positive[axis] = max[axis];
                    negative[axis] = min[axis];
                }
            }

            if plane.distance_to_point(&positive) < 0.0 {
                return Containment::Outside;
            }
            if plane.distance_to_point(&negative) < 0.0 {
                result = Containment::Intersecting;
            }
        }
        result
    }
}

/// Extract the six planes of `mvp`
pub fn build_frustum(mvp: &Mat4) -> Frustum {
    Frustum::from_matrix(mvp)
}

/// Corner test: rejected only if all eight corners are outside a single plane.
///
/// Conservative: a large box crossing a frustum edge with no corner inside may
/// still be reported as inside.
pub fn is_box_in_frustum(frustum: &Frustum, min: &Vec3, max: &Vec3) -> bool {
    let corners = [
        Vec3::new(min.x, min.y, min.z),
        Vec3::new(max.x, min.y, min.z),
        Vec3::new(min.x, max.y, min.z),
        Vec3::new(max.x, max.y, min.z),
        Vec3::new(min.x, min.y, max.z),
        Vec3::new(max.x, min.y, max.z),
        Vec3::new(min.x, max.y, max.z),
        Vec3::new(max.x, max.y, max.z),
    ];

    frustum.planes.iter().all(|plane| {
        corners.iter().any(|corner| plane.distance_to_point(corner) > 0.0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4Ext, Point3, utils::deg_to_rad};
    use approx::assert_relative_eq;

    fn projection() -> Mat4 {
        Mat4::perspective(deg_to_rad(90.0), 1.0, 1.0, 100.0)
    }

    fn view_projection(eye: Vec3, target: Vec3) -> Mat4 {
        projection() * Mat4::look_at(eye, target, Vec3::y())
    }

    #[test]
    fn test_planes_are_normalized() {
        let frustum = build_frustum(&view_projection(Vec3::new(1.0, 2.0, 3.0), Vec3::zeros()));
        for plane in &frustum.planes {
            assert_relative_eq!(plane.normal.norm(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_zero_normal_stays_finite() {
        let plane = Plane::from_coefficients(Vec4::new(0.0, 0.0, 0.0, 0.5));
        assert!(plane.normal.iter().all(|v| v.is_finite()));
        assert!(plane.distance.is_finite());
    }

    #[test]
    fn test_identity_view_plane_positions() {
        let frustum = build_frustum(&projection());
        // near plane at z = -1 facing -z, far plane at z = -100 facing +z
        let near = frustum.planes[Frustum::NEAR];
        let far = frustum.planes[Frustum::FAR];
        assert_relative_eq!(near.normal, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
        assert_relative_eq!(near.distance, -1.0, epsilon = 1e-4);
        assert_relative_eq!(far.normal, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-5);
        assert_relative_eq!(far.distance, 100.0, epsilon = 1e-2);

        // 90 degree fov: side planes at 45 degrees
        let right = frustum.planes[Frustum::RIGHT];
        let diagonal = std::f32::consts::FRAC_1_SQRT_2;
        assert_relative_eq!(right.normal, Vec3::new(-diagonal, 0.0, -diagonal), epsilon = 1e-5);
    }

    #[test]
    fn test_points_inside_and_outside() {
        let frustum = build_frustum(&projection());
        assert!(frustum.contains_point(&Vec3::new(0.0, 0.0, -10.0)));
        assert!(!frustum.contains_point(&Vec3::new(0.0, 0.0, 10.0)));
        assert!(!frustum.contains_point(&Vec3::new(0.0, 0.0, -0.5)));
        assert!(!frustum.contains_point(&Vec3::new(0.0, 0.0, -200.0)));
        assert!(!frustum.contains_point(&Vec3::new(20.0, 0.0, -10.0)));
    }

    #[test]
    fn test_enclosing_box_is_in_frustum_for_any_orientation() {
        let targets = [
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(-1.0, 0.5, 0.3),
            Vec3::new(0.2, -1.0, 0.4),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        for target in targets {
            let frustum = build_frustum(&view_projection(Vec3::zeros(), target));
            let min = Vec3::repeat(-500.0);
            let max = Vec3::repeat(500.0);
            assert!(is_box_in_frustum(&frustum, &min, &max), "target {target:?}");
            assert_ne!(frustum.classify_box(&min, &max), Containment::Outside);
        }
    }

    #[test]
    fn test_far_away_box_is_rejected() {
        let frustum = build_frustum(&view_projection(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0)));
        let offsets = [
            Vec3::new(0.0, 0.0, 1000.0),
            Vec3::new(0.0, 0.0, -1000.0),
            Vec3::new(1000.0, 0.0, -10.0),
            Vec3::new(0.0, -1000.0, -10.0),
        ];
        for offset in offsets {
            let min = offset - Vec3::repeat(1.0);
            let max = offset + Vec3::repeat(1.0);
            assert!(!is_box_in_frustum(&frustum, &min, &max), "offset {offset:?}");
            assert_eq!(frustum.classify_box(&min, &max), Containment::Outside);
        }
    }

    #[test]
    fn test_model_matrix_folded_into_planes() {
        // box at the origin of a model translated 10 units in front of the camera
        let model = Mat4::new_translation(&Vec3::new(0.0, 0.0, -10.0));
        let frustum = build_frustum(&(projection() * model));
        assert!(is_box_in_frustum(&frustum, &Vec3::repeat(-1.0), &Vec3::repeat(1.0)));

        let behind = Mat4::new_translation(&Vec3::new(0.0, 0.0, 10.0));
        let frustum = build_frustum(&(projection() * behind));
        assert!(!is_box_in_frustum(&frustum, &Vec3::repeat(-1.0), &Vec3::repeat(1.0)));
    }

    #[test]
    fn test_classification() {
        let frustum = build_frustum(&projection());
        let inside = Point3::new(0.0, 0.0, -10.0).coords;
        assert_eq!(frustum.classify_sphere(&inside, 1.0), Containment::Inside);
        assert_eq!(frustum.classify_sphere(&inside, 9.5), Containment::Intersecting);
        assert_eq!(frustum.classify_sphere(&Vec3::new(0.0, 0.0, 50.0), 1.0), Containment::Outside);
        assert!(!frustum.intersects_sphere(&Vec3::new(0.0, 0.0, 50.0), 1.0));

        assert_eq!(
            frustum.classify_box(&Vec3::new(-1.0, -1.0, -11.0), &Vec3::new(1.0, 1.0, -9.0)),
            Containment::Inside
        );
        assert_eq!(
            frustum.classify_box(&Vec3::new(-1.0, -1.0, -2.0), &Vec3::new(1.0, 1.0, 0.0)),
            Containment::Intersecting
        );
    }
}
