//! Bounding volumes for culling, LOD and picking
//!
//! A [`BoundingVolume`] keeps a sphere and an axis-aligned box describing the
//! same extent. After every mutation `center == (min + max) / 2` and
//! `radius == |max - center|`. Merging is sphere-based: the box is re-derived
//! as the cube inscribed in the merged sphere, which loses tightness for
//! anisotropic geometry.

use crate::foundation::math::{Mat4, Vec3, transform_position};

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// The eight corners, x varying fastest
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB overlaps another AABB (touching faces do not count)
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x < other.max.x && self.max.x > other.min.x &&
        self.min.y < other.max.y && self.max.y > other.min.y &&
        self.min.z < other.max.z && self.max.z > other.min.z
    }

    /// Transform this box by an affine matrix and return the enclosing AABB.
    ///
    /// Arvo, "Transforming Axis-Aligned Bounding Boxes", Graphics Gems:
    /// start each output axis at the translation, then for every input axis
    /// add the smaller / larger of `M[i][j] * min_j` and `M[i][j] * max_j`.
    pub fn transformed(&self, matrix: &Mat4) -> AABB {
        let mut min = Vec3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);
        let mut max = min;
        for i in 0..3 {
            for j in 0..3 {
                let a = matrix[(i, j)] * self.min[j];
                let b = matrix[(i, j)] * self.max[j];
                if a < b {
                    min[i] += a;
                    max[i] += b;
                } else {
                    min[i] += b;
                    max[i] += a;
                }
            }
        }
        AABB { min, max }
    }

    /// Test ray intersection with this AABB using slab method
    /// Returns the distance to the entry point if the ray intersects, None otherwise
    /// Based on "An Efficient and Robust Ray–Box Intersection Algorithm"
    pub fn intersect_ray(&self, ray_origin: Vec3, ray_dir: Vec3) -> Option<f32> {
        let inv_dir = Vec3::new(
            if ray_dir.x != 0.0 { 1.0 / ray_dir.x } else { f32::INFINITY },
            if ray_dir.y != 0.0 { 1.0 / ray_dir.y } else { f32::INFINITY },
            if ray_dir.z != 0.0 { 1.0 / ray_dir.z } else { f32::INFINITY },
        );

        let t1 = (self.min.x - ray_origin.x) * inv_dir.x;
        let t2 = (self.max.x - ray_origin.x) * inv_dir.x;
        let t3 = (self.min.y - ray_origin.y) * inv_dir.y;
        let t4 = (self.max.y - ray_origin.y) * inv_dir.y;
        let t5 = (self.min.z - ray_origin.z) * inv_dir.z;
        let t6 = (self.max.z - ray_origin.z) * inv_dir.z;

        let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

        // Ray intersects if tmax >= tmin and tmax >= 0
        if tmax >= tmin && tmax >= 0.0 {
            // Return entry point distance (or 0 if we're inside the box)
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

/// Sphere + box pair describing one conservative extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingVolume {
    center: Vec3,
    radius: f32,
    min_corner: Vec3,
    max_corner: Vec3,
}

impl Default for BoundingVolume {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingVolume {
    /// An empty volume that absorbs whatever is expanded into it first
    pub fn new() -> Self {
        Self {
            center: Vec3::zeros(),
            radius: 0.0,
            min_corner: Vec3::repeat(f32::INFINITY),
            max_corner: Vec3::repeat(f32::NEG_INFINITY),
        }
    }

    /// Volume covering a box
    pub fn from_box(min_corner: Vec3, max_corner: Vec3) -> Self {
        let mut volume = Self::new();
        volume.expand_point(min_corner);
        volume.expand_point(max_corner);
        volume
    }

    /// Volume covering a sphere (the box is the inscribed cube)
    pub fn from_sphere(center: Vec3, radius: f32) -> Self {
        let mut volume = Self::new();
        volume.expand_sphere(center, radius);
        volume
    }

    /// Volume covering a set of points
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut volume = Self::new();
        for point in points {
            volume.expand_point(*point);
        }
        volume
    }

    /// Back to the empty state (`min = +inf`, `max = -inf`)
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// True until something has been expanded into the volume
    pub fn is_empty(&self) -> bool {
        self.min_corner.x > self.max_corner.x
    }

    /// Sphere centre
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Sphere radius
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Box minimum corner
    pub fn min_corner(&self) -> Vec3 {
        self.min_corner
    }

    /// Box maximum corner
    pub fn max_corner(&self) -> Vec3 {
        self.max_corner
    }

    /// The box as an [`AABB`]
    pub fn aabb(&self) -> AABB {
        AABB::new(self.min_corner, self.max_corner)
    }

    /// Grow the box to include `point`, then re-derive the sphere from it.
    pub fn expand_point(&mut self, point: Vec3) {
        self.min_corner = self.min_corner.inf(&point);
        self.max_corner = self.max_corner.sup(&point);
        self.center = (self.min_corner + self.max_corner) * 0.5;
        self.radius = (self.max_corner - self.center).norm();
    }

    /// Merge a sphere into this volume.
    ///
    /// The result is the smallest sphere covering both: the outer points of
    /// each sphere along the centre-to-centre axis bound the new diameter.
    /// The box becomes the cube inscribed in that sphere, half-extent
    /// `sqrt(r² / 3)` on every axis.
    pub fn expand_sphere(&mut self, in_center: Vec3, in_radius: f32) {
        if in_radius < 0.0 || !in_radius.is_finite() {
            return;
        }

        if self.is_empty() {
            self.center = in_center;
            self.radius = in_radius;
        } else {
            let offset = in_center - self.center;
            let length = offset.norm();

            if length == 0.0 {
                if in_radius > self.radius {
                    self.radius = in_radius;
                }
            } else if in_radius >= length + self.radius {
                // incoming sphere swallows ours
                self.center = in_center;
                self.radius = in_radius;
            } else if length + in_radius > self.radius {
                let direction = offset / length;
                let outer_incoming = in_center + direction * in_radius;
                let outer_current = self.center - direction * self.radius;
                self.center = (outer_current + outer_incoming) * 0.5;
                self.radius = (outer_incoming - outer_current).norm() * 0.5;
            }
        }

        self.inscribe_box();
    }

    /// Merge another volume. Only its sphere is used; its box is discarded.
    pub fn expand(&mut self, other: &BoundingVolume) {
        if other.is_empty() {
            return;
        }
        self.expand_sphere(other.center, other.radius);
    }

    /// Replace this volume with itself transformed by `matrix`.
    ///
    /// Sphere path: the centre and three axis offsets `center + radius * e_i`
    /// are transformed; the largest transformed offset becomes the radius.
    pub fn transform(&mut self, matrix: &Mat4) {
        if self.is_empty() {
            return;
        }

        let center = transform_position(matrix, &self.center);
        let radius = [Vec3::x(), Vec3::y(), Vec3::z()]
            .iter()
            .map(|axis| {
                let edge = transform_position(matrix, &(self.center + axis * self.radius));
                (edge - center).norm()
            })
            .fold(0.0_f32, f32::max);

        self.reset();
        self.expand_sphere(center, radius);
    }

    /// A transformed copy of this volume
    pub fn transformed(&self, matrix: &Mat4) -> BoundingVolume {
        let mut volume = *self;
        volume.transform(matrix);
        volume
    }

    fn inscribe_box(&mut self) {
        let side = ((self.radius * self.radius) / 3.0).sqrt();
        let half = Vec3::repeat(side);
        self.min_corner = self.center - half;
        self.max_corner = self.center + half;
    }
}
