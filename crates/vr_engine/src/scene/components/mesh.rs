//! Triangle meshes as seen by the visibility pipeline
//!
//! The core never uploads geometry; it only needs positions for bounds, the
//! triangle count for statistics and a cheap box proxy for occlusion queries.

use crate::foundation::math::{Mat4, Vec3};
use crate::scene::bounding_volume::{AABB, BoundingVolume};

/// Immutable indexed triangle mesh, shared between render data through `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    bounding_volume: BoundingVolume,
}

impl Mesh {
    /// Build a mesh and cache its local bounding volume
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let bounding_volume = BoundingVolume::from_points(&positions);
        Self {
            positions,
            indices,
            bounding_volume,
        }
    }

    /// Axis-aligned cube centred on the origin
    pub fn cube(half_extent: f32) -> Self {
        Self::from_box(&AABB::new(Vec3::repeat(-half_extent), Vec3::repeat(half_extent)))
    }

    /// Unit quad in the XY plane, two triangles, used for full-screen passes
    pub fn quad(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        let positions = vec![
            Vec3::new(-hw, -hh, 0.0),
            Vec3::new(hw, -hh, 0.0),
            Vec3::new(hw, hh, 0.0),
            Vec3::new(-hw, hh, 0.0),
        ];
        Self::new(positions, vec![0, 1, 2, 0, 2, 3])
    }

    /// Closed 12-triangle box with the corners of `aabb`
    pub fn from_box(aabb: &AABB) -> Self {
        // counter-clockwise when seen from outside
        const INDICES: [u32; 36] = [
            0, 2, 1, 1, 2, 3, // -z
            4, 5, 6, 5, 7, 6, // +z
            0, 1, 4, 1, 5, 4, // -y
            2, 6, 3, 3, 6, 7, // +y
            0, 4, 2, 2, 4, 6, // -x
            1, 3, 5, 3, 7, 5, // +x
        ];
        Self::new(aabb.corners().to_vec(), INDICES.to_vec())
    }

    /// Vertex positions in model space
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Triangle list indices
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Model-space bounding volume, computed once at construction
    pub fn bounding_volume(&self) -> &BoundingVolume {
        &self.bounding_volume
    }

    /// Model-space box (tight, unlike the box of a merged volume)
    pub fn aabb(&self) -> AABB {
        self.bounding_volume.aabb()
    }

    /// Proxy mesh drawn instead of this one for occlusion queries
    pub fn bounding_box_mesh(&self) -> Mesh {
        Mesh::from_box(&self.aabb())
    }

    /// This mesh's box carried into another space with the Arvo transform
    pub fn transformed_bounding_box(&self, matrix: &Mat4) -> AABB {
        self.aabb().transformed(matrix)
    }
}
