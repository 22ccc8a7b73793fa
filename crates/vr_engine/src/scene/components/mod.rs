//! Components attachable to scene nodes
//!
//! Every node has one slot per component kind. A component records the node
//! that owns it; the graph sets and clears that back-reference when the
//! component is attached or detached.

mod transform;
mod mesh;
mod material;
mod render_data;
mod camera;
mod camera_rig;
mod pickable;
mod post_effect;

pub use transform::NodeTransform;
pub use mesh::Mesh;
pub use material::{Material, MaterialId};
pub use render_data::{RenderData, RenderMask, CullFace, PolygonOffset, RenderQueue};
pub use camera::Camera;
pub use camera_rig::{CameraRig, Eye, DEFAULT_CAMERA_SEPARATION};
pub use pickable::PickableVolume;
pub use post_effect::PostEffectData;
