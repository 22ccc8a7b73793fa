//! Pickable-volume holder

use crate::scene::NodeId;
use crate::scene::bounding_volume::BoundingVolume;

/// Marks a node as a target for ray picking.
///
/// Without an explicit volume the node's mesh box is hit-tested.
#[derive(Debug, Clone, PartialEq)]
pub struct PickableVolume {
    /// Disabled holders are skipped by picking
    pub enabled: bool,
    volume: Option<BoundingVolume>,
    owner: Option<NodeId>,
}

impl Default for PickableVolume {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: None,
            owner: None,
        }
    }
}

impl PickableVolume {
    /// Pick against the mesh box
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick against an explicit model-space volume
    pub fn with_volume(volume: BoundingVolume) -> Self {
        Self {
            volume: Some(volume),
            ..Self::default()
        }
    }

    /// The explicit volume, if any
    pub fn volume(&self) -> Option<&BoundingVolume> {
        self.volume.as_ref()
    }

    /// Node this component is attached to
    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Option<NodeId>) {
        self.owner = owner;
    }
}
