//! Side tables shared with code outside the traversal.
//!
//! [`CustomizationTable`] holds the overrides a scripting sandbox publishes per node.
//! The traversal only reads it, once per node per pass. [`OriginModifications`] goes
//! the other way: origin-type attachment points record where they ended up so the host
//! can place held items, wings and shoulder accessories there.

use std::{collections::HashMap, sync::Arc};

use cgmath::{Vector2, Vector3};
use parking_lot::RwLock;

use crate::data_structures::{
    attachment::AttachmentPoint,
    matrix_stack::StackEntry,
    node::{AvatarNode, NodeId},
    transform::PartTransform,
};

/// Optional overrides for one node. `None` means "use the authored value".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartCustomization {
    pub position: Option<Vector3<f32>>,
    pub rotation: Option<Vector3<f32>>,
    pub scale: Option<Vector3<f32>>,
    pub pivot: Option<Vector3<f32>>,
    pub visible: Option<bool>,
    pub color: Option<Vector3<f32>>,
    pub opacity: Option<f32>,
    pub uv_offset: Option<Vector2<f32>>,
}

impl PartCustomization {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn transform(&self, authored: &PartTransform) -> PartTransform {
        PartTransform {
            position: self.position.unwrap_or(authored.position),
            pivot: self.pivot.unwrap_or(authored.pivot),
            rotation: self.rotation.unwrap_or(authored.rotation),
            scale: self.scale.unwrap_or(authored.scale),
        }
    }
}

/// Concurrent, node-keyed overrides. Clones share the same table.
#[derive(Clone, Debug, Default)]
pub struct CustomizationTable {
    parts: Arc<RwLock<HashMap<NodeId, PartCustomization>>>,
}

impl CustomizationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, node: NodeId, customization: PartCustomization) {
        let mut parts = self.parts.write();
        if customization.is_empty() {
            parts.remove(&node);
        } else {
            parts.insert(node, customization);
        }
    }

    pub fn update(&self, node: NodeId, edit: impl FnOnce(&mut PartCustomization)) {
        let mut parts = self.parts.write();
        let entry = parts.entry(node).or_default();
        edit(entry);
        if entry.is_empty() {
            parts.remove(&node);
        }
    }

    pub fn get(&self, node: NodeId) -> Option<PartCustomization> {
        self.parts.read().get(&node).cloned()
    }

    pub fn remove(&self, node: NodeId) {
        self.parts.write().remove(&node);
    }

    pub fn clear(&self) {
        self.parts.write().clear();
    }
}

/// The effective per-pass view of a node after overrides.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedPart {
    pub transform: PartTransform,
    pub visible: bool,
    pub color: Vector3<f32>,
    pub opacity: f32,
    pub uv_offset: Vector2<f32>,
}

impl ResolvedPart {
    pub fn new(node: &AvatarNode, customization: Option<&PartCustomization>) -> Self {
        match customization {
            None => Self {
                transform: node.transform,
                visible: node.visible,
                color: node.color,
                opacity: node.opacity,
                uv_offset: node.uv_offset,
            },
            Some(c) => Self {
                transform: c.transform(&node.transform),
                visible: c.visible.unwrap_or(node.visible),
                color: c.color.unwrap_or(node.color),
                opacity: c.opacity.unwrap_or(node.opacity),
                uv_offset: c.uv_offset.unwrap_or(node.uv_offset),
            },
        }
    }
}

/// Where an origin-type node placed its slot this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OriginOffset {
    pub entry: StackEntry,
    pub node: NodeId,
    pub visible: bool,
}

/// Origin offsets keyed by slot, rebuilt during full renders.
#[derive(Clone, Debug, Default)]
pub struct OriginModifications {
    offsets: HashMap<AttachmentPoint, OriginOffset>,
}

impl OriginModifications {
    pub fn insert(&mut self, slot: AttachmentPoint, offset: OriginOffset) {
        self.offsets.insert(slot, offset);
    }

    pub fn get(&self, slot: AttachmentPoint) -> Option<&OriginOffset> {
        self.offsets.get(&slot)
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn clear(&mut self) {
        self.offsets.clear();
    }
}
