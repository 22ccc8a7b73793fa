//! Stereo camera rig

use crate::scene::NodeId;
use super::RenderMask;

/// Default distance between the eyes, in metres
pub const DEFAULT_CAMERA_SEPARATION: f32 = 0.062;

/// One of the rig's cameras
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    /// Left eye camera
    Left,
    /// Right eye camera
    Right,
    /// Centre camera, used for picking and monoscopic rendering
    Center,
}

impl Eye {
    /// Render mask bits for this eye
    pub fn mask(self) -> RenderMask {
        match self {
            Eye::Left => RenderMask::LEFT,
            Eye::Right => RenderMask::RIGHT,
            Eye::Center => RenderMask::BOTH,
        }
    }

    /// Eye a camera with this render mask renders for
    pub fn from_mask(mask: RenderMask) -> Eye {
        if mask == RenderMask::LEFT {
            Eye::Left
        } else if mask == RenderMask::RIGHT {
            Eye::Right
        } else {
            Eye::Center
        }
    }
}

/// Groups the camera nodes of a head.
///
/// The rig lives on the head node; the eye nodes are its children and each
/// carries a [`Camera`](super::Camera). Attaching the rig offsets the eye
/// nodes by half the separation.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraRig {
    left: NodeId,
    right: NodeId,
    center: NodeId,
    camera_separation: f32,
    owner: Option<NodeId>,
}

impl CameraRig {
    /// Rig over existing camera nodes
    pub fn new(left: NodeId, right: NodeId, center: NodeId) -> Self {
        Self {
            left,
            right,
            center,
            camera_separation: DEFAULT_CAMERA_SEPARATION,
            owner: None,
        }
    }

    /// Builder: eye separation
    pub fn with_separation(mut self, separation: f32) -> Self {
        self.camera_separation = separation;
        self
    }

    /// Camera node for `eye`
    pub fn camera_for(&self, eye: Eye) -> NodeId {
        match eye {
            Eye::Left => self.left,
            Eye::Right => self.right,
            Eye::Center => self.center,
        }
    }

    /// Distance between the left and right eye
    pub fn camera_separation(&self) -> f32 {
        self.camera_separation
    }

    /// Node this rig is attached to
    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Option<NodeId>) {
        self.owner = owner;
    }
}
