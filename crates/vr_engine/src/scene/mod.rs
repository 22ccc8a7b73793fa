//! Scene graph
//!
//! Hierarchical nodes stored in an arena, the components they carry and the
//! lazily maintained bounding volumes the render pass culls against.
//!
//! ## Architecture
//!
//! ```text
//! Scene (root, settings, dirty flag)
//!      ↓
//! SceneGraph (arena of SceneNodes)
//!      ↓
//! Components (transform, render data, camera, rig, pickable volume)
//! ```
//!
//! Bounding volumes are cached per node and recomputed on demand. Every
//! mutation that can change a subtree's extent marks the node dirty and the
//! mark travels up to the root.

use thiserror::Error;

pub mod bounding_volume;
pub mod components;
mod node;
mod scene_graph;
#[allow(clippy::module_inception)]
mod scene;

pub use bounding_volume::{AABB, BoundingVolume};
pub use node::{NodeId, OcclusionQuery, QueryId, SceneNode, VISIBILITY_CHECK_FRAMES};
pub use scene_graph::{PickHit, SceneGraph};
pub use scene::Scene;

/// Scene-graph errors. Each one aborts only the attempted operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The child is the parent itself or one of its ancestors
    #[error("Adding {child:?} under {parent:?} would create a cycle")]
    CycleDetected {
        /// Requested parent
        parent: NodeId,
        /// Requested child
        child: NodeId,
    },

    /// Child index past the end of the child list
    #[error("Child index {index} out of range ({len} children)")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of children
        len: usize,
    },

    /// The id does not name a live node
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// The operation needs a component the node does not have
    #[error("Node {node:?} has no {component}")]
    MissingComponent {
        /// Node queried
        node: NodeId,
        /// Component kind
        component: &'static str,
    },

    /// Nodes must be detached from their parent before destruction
    #[error("Node {0:?} is still attached to a parent")]
    StillAttached(NodeId),
}

/// Result type for scene-graph operations
pub type SceneResult<T> = Result<T, SceneError>;
