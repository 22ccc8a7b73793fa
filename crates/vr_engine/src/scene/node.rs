//! Scene nodes and their occlusion-query handles

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::foundation::math::Mat4;
use super::bounding_volume::BoundingVolume;
use super::components::{Camera, CameraRig, NodeTransform, PickableVolume, RenderData};

slotmap::new_key_type! {
    /// Handle to a node in a [`SceneGraph`](super::SceneGraph)
    pub struct NodeId;
}

/// Consecutive agreeing visibility reports needed before `visible` flips.
///
/// A node changes state on the `VISIBILITY_CHECK_FRAMES + 1`-th report in a row.
pub const VISIBILITY_CHECK_FRAMES: i32 = 4;

/// Identifier of a GPU occlusion query object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryId(u64);

impl QueryId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        QueryId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value, for backends that key their query objects by integer
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Queries whose owning node has been dropped, waiting for the GPU side to be deleted
pub(crate) type ReleaseList = Arc<Mutex<Vec<QueryId>>>;

/// The single occlusion query owned by a node.
///
/// Acquired when the node is created; dropping it hands the id to the graph's
/// release list so the renderer can delete the GPU object on its next pass.
#[derive(Debug)]
pub struct OcclusionQuery {
    id: QueryId,
    pending: bool,
    release: ReleaseList,
}

impl OcclusionQuery {
    pub(crate) fn new(release: ReleaseList) -> Self {
        Self {
            id: QueryId::next(),
            pending: false,
            release,
        }
    }

    /// Query object id
    pub fn id(&self) -> QueryId {
        self.id
    }

    /// True while an issued query has not been read back
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub(crate) fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }
}

impl Drop for OcclusionQuery {
    fn drop(&mut self) {
        self.release
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(self.id);
    }
}

/// A node of the scene hierarchy.
///
/// Nodes are owned by the graph arena; links between them are [`NodeId`]s.
/// Structural edits go through [`SceneGraph`](super::SceneGraph) so the
/// bounding-volume cache stays valid.
#[derive(Debug)]
pub struct SceneNode {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,

    pub(crate) transform: Option<NodeTransform>,
    pub(crate) render_data: Option<RenderData>,
    pub(crate) camera: Option<Camera>,
    pub(crate) camera_rig: Option<CameraRig>,
    pub(crate) pickable: Option<PickableVolume>,

    pub(crate) world_matrix: Option<Mat4>,
    pub(crate) bounding_volume: BoundingVolume,
    pub(crate) bounding_volume_dirty: bool,

    visible: bool,
    visibility_counter: i32,
    pub(crate) in_frustum: bool,

    pub(crate) lod_min_range: f32,
    pub(crate) lod_max_range: f32,
    pub(crate) using_lod: bool,

    pub(crate) occlusion_query: OcclusionQuery,
}

impl SceneNode {
    pub(crate) fn new(name: String, release: ReleaseList) -> Self {
        Self {
            name,
            parent: None,
            children: Vec::new(),
            transform: None,
            render_data: None,
            camera: None,
            camera_rig: None,
            pickable: None,
            world_matrix: None,
            bounding_volume: BoundingVolume::new(),
            bounding_volume_dirty: true,
            visible: true,
            visibility_counter: 0,
            in_frustum: false,
            lod_min_range: 0.0,
            lod_max_range: f32::MAX,
            using_lod: false,
            occlusion_query: OcclusionQuery::new(release),
        }
    }

    /// Debug name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent node, `None` for roots and detached nodes
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Transform component
    pub fn transform(&self) -> Option<&NodeTransform> {
        self.transform.as_ref()
    }

    /// Render data component
    pub fn render_data(&self) -> Option<&RenderData> {
        self.render_data.as_ref()
    }

    /// Camera component
    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    /// Camera rig component
    pub fn camera_rig(&self) -> Option<&CameraRig> {
        self.camera_rig.as_ref()
    }

    /// Pickable-volume component
    pub fn pickable(&self) -> Option<&PickableVolume> {
        self.pickable.as_ref()
    }

    /// Filtered visibility, see [`SceneNode::set_visible`]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the last cull found the node inside the frustum
    pub fn in_frustum(&self) -> bool {
        self.in_frustum
    }

    /// True while the cached bounding volume needs recomputing
    pub fn is_bounding_volume_dirty(&self) -> bool {
        self.bounding_volume_dirty
    }

    /// LOD range as squared distances, when LOD is enabled
    pub fn lod_range(&self) -> Option<(f32, f32)> {
        self.using_lod.then_some((self.lod_min_range, self.lod_max_range))
    }

    /// The node's occlusion query
    pub fn occlusion_query(&self) -> &OcclusionQuery {
        &self.occlusion_query
    }

    /// Report one frame's visibility.
    ///
    /// Reports are counted (+1 visible, -1 hidden); the visible flag only
    /// flips once the count passes `±VISIBILITY_CHECK_FRAMES`, after which the
    /// count starts over.
    pub fn set_visible(&mut self, visibility: bool) {
        if visibility {
            self.visibility_counter += 1;
        } else {
            self.visibility_counter -= 1;
        }

        if self.visibility_counter > VISIBILITY_CHECK_FRAMES {
            self.visible = true;
            self.visibility_counter = 0;
        } else if self.visibility_counter < -VISIBILITY_CHECK_FRAMES {
            self.visible = false;
            self.visibility_counter = 0;
        }
    }
}
